//! Log output for the terminal host.
//!
//! Events go to stderr so the live readout on stdout stays on one line.

use std::sync::OnceLock;

use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Host and core library at `info`.
const DEFAULT_DIRECTIVES: &str = "pitchtrack=info,pitchtrack_core=info";
/// Adds config hot-swaps, hybrid switches and outlier rejections.
const VERBOSE_DIRECTIVES: &str = "pitchtrack=debug,pitchtrack_core=debug";

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once. A non-empty `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    TELEMETRY_INIT.get_or_init(|| {
        let requested = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        let (env_filter, directives) = select_filter(requested.as_deref(), verbose);

        if let Err(err) = fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .try_init()
        {
            eprintln!("[telemetry] failed to initialise tracing subscriber: {err}");
            return;
        }
        info!("[telemetry] log filter '{directives}'");
    });
}

/// Builds the filter from `requested` (the raw `RUST_LOG` value) or the host
/// defaults, and returns it with the directives it was built from.
fn select_filter(requested: Option<&str>, verbose: bool) -> (EnvFilter, String) {
    if let Some(raw) = requested.map(str::trim).filter(|raw| !raw.is_empty()) {
        match EnvFilter::try_new(raw) {
            Ok(filter) => return (filter, raw.to_string()),
            Err(err) => eprintln!(
                "[telemetry] ignoring {}='{raw}': {err}",
                EnvFilter::DEFAULT_ENV
            ),
        }
    }

    let directives = if verbose {
        VERBOSE_DIRECTIVES
    } else {
        DEFAULT_DIRECTIVES
    };
    let filter = EnvFilter::try_new(directives)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));
    (filter, directives.to_string())
}
