// pitchtrack-cli/src/main.rs

//! Terminal host for the pitch tracker.
//!
//! Opens the default microphone, drives a [`PitchSession`] from a fixed
//! frame clock and prints a live readout until Enter is pressed (or the
//! optional duration runs out). A JSON summary of the run is printed at exit.

mod args;
mod readout;
mod telemetry;

use std::io::{BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::StreamTrait;
use crossbeam_channel::select;
use tracing::{error, info, warn};

use args::{Options, USAGE};
use pitchtrack_core::SessionConfig;
use pitchtrack_core::audio;
use pitchtrack_core::session::{PitchSession, TickOutcome};
use pitchtrack_core::summary::SessionSummary;

/// Host frame clock, roughly one display refresh.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() {
    let options = Options::parse(std::env::args().skip(1));
    telemetry::init(options.as_ref().is_ok_and(|o| o.verbose));
    if let Err(err) = options.and_then(run) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(options: Options) -> Result<()> {
    if options.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = match &options.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(secs) = options.duration_secs {
        config.detection_loop.max_duration_ms = Some((secs * 1000.0).round().max(1.0) as u64);
    }
    if options.dump_config {
        println!("{}", config.to_json_string()?);
        return Ok(());
    }

    let (stream, capture) = audio::start_default_capture(config.detection.frame_size)
        .context("failed to open the microphone")?;
    if capture.sample_rate != config.detection.sample_rate {
        warn!(
            "[main] device runs at {} Hz, overriding configured {} Hz",
            capture.sample_rate, config.detection.sample_rate
        );
        config.detection.sample_rate = capture.sample_rate;
    }

    let mut session = PitchSession::new();
    let results = session.subscribe();
    session
        .start(config, capture)
        .context("failed to start the detection session")?;
    info!("[main] listening, press Enter to stop");

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        let _ = shutdown_tx.send(());
    });

    let ticker = crossbeam_channel::tick(FRAME_INTERVAL);
    let mut summary = SessionSummary::new();
    let mut stdout = std::io::stdout();
    loop {
        select! {
            recv(ticker) -> _ => match session.on_frame(Instant::now()) {
                TickOutcome::Published(value) => {
                    let _ = write!(stdout, "\r{:<72}", readout::format_readout(&value));
                    let _ = stdout.flush();
                }
                TickOutcome::Skipped => {}
                TickOutcome::Inactive => break,
            },
            recv(shutdown_rx) -> _ => break,
        }
        record_pending(&results, &mut summary);
    }
    println!();

    session.stop();
    record_pending(&results, &mut summary);
    if let Err(err) = stream.pause() {
        warn!("[main] error pausing stream: {err}");
    }
    drop(stream);

    match summary.finish() {
        Some(report) => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{json}");
            if let Some(path) = &options.summary {
                std::fs::write(path, &json)
                    .with_context(|| format!("failed to write summary to {}", path.display()))?;
                info!("[main] summary written to {}", path.display());
            }
        }
        None => info!("[main] no voiced audio captured, nothing to summarise"),
    }
    Ok(())
}

fn record_pending(
    results: &crossbeam_channel::Receiver<pitchtrack_core::PublishedPitch>,
    summary: &mut SessionSummary,
) {
    for value in results.try_iter() {
        summary.record(&value);
    }
}
