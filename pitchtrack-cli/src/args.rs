//! Command-line options.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

pub const USAGE: &str = "\
usage: pitchtrack [OPTIONS]

options:
  -c, --config <FILE>    load session settings from a JSON file
  -d, --duration <SECS>  stop automatically after this many seconds
  -s, --summary <FILE>   write the session report as JSON
      --dump-config      print the effective settings and exit
  -v, --verbose          log config changes and detector decisions
  -h, --help             show this help";

#[derive(Debug, Default, PartialEq)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub duration_secs: Option<f64>,
    pub summary: Option<PathBuf>,
    pub dump_config: bool,
    pub verbose: bool,
    pub help: bool,
}

impl Options {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Options::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    options.config = Some(value(&mut args, &arg)?.into());
                }
                "-d" | "--duration" => {
                    let raw = value(&mut args, &arg)?;
                    let secs: f64 = raw
                        .parse()
                        .with_context(|| format!("invalid duration '{raw}'"))?;
                    if !secs.is_finite() || secs <= 0.0 {
                        bail!("duration must be a positive number of seconds");
                    }
                    options.duration_secs = Some(secs);
                }
                "-s" | "--summary" => {
                    options.summary = Some(value(&mut args, &arg)?.into());
                }
                "--dump-config" => options.dump_config = true,
                "-v" | "--verbose" => options.verbose = true,
                "-h" | "--help" => options.help = true,
                other => bail!("unknown argument '{other}'\n\n{USAGE}"),
            }
        }
        Ok(options)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{flag} expects a value"))
}
