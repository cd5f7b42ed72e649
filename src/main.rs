//! Command-line capture tool
//!
//! Reads `<wait_cycles> <address> <value>` records from standard input,
//! replays them into the reference SID and writes raw 24-bit big-endian PCM
//! (or a Value Change Dump with `--trace`).

use anyhow::{Context, Result};
use clap::Parser;
use sid_capture::{
    output, BusSid, CaptureMode, CommandStream, Config, ConfigError, Options, PcmSink, Session,
    SidCaptureError,
};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const HELP_HINT: &str = "Try 'sid-capture --help' for more information.";

#[derive(Parser, Debug)]
#[command(name = "sid-capture", version)]
#[command(about = "Replay SID register writes on a cycle-accurate bus and capture raw PCM")]
#[command(
    after_help = "Records are read from standard input, one write per line:\n  \
                  <wait_cycles> <address> <value>\n\
                  Numbers may be decimal, 0x-prefixed hexadecimal or 0-prefixed octal.\n\
                  Output is headerless mono 24-bit big-endian PCM."
)]
struct Cli {
    /// Write to standard output instead of a file
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Output file [default: sid_capture.raw, or sid_capture.vcd with --trace]
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Filter stages to enable: sid, ext, all or none
    #[arg(short, long, default_value = "all", value_name = "MODE")]
    filter: String,

    /// External filter band in Hz (1 <= FROM < TO <= 20000)
    #[arg(short = 'p', long, default_value = "10-16000", value_name = "FROM-TO")]
    bandpass: String,

    /// Output sample rate in Hz
    #[arg(short = 'r', long, default_value = "96000", value_name = "HZ")]
    sample_rate: String,

    /// SID model: 6581 or 8580
    #[arg(short, long, default_value = "6581", value_name = "MODEL")]
    sid_model: String,

    /// Video standard: pal, ntsc or pal-n
    #[arg(short, long, default_value = "pal", value_name = "STANDARD")]
    video_standard: String,

    /// Capture a waveform trace of every clock edge instead of audio
    #[arg(long)]
    trace: bool,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            stdout: self.stdout,
            output: self.output.clone(),
            trace: self.trace,
            filter: self.filter.clone(),
            bandpass: self.bandpass.clone(),
            sample_rate: self.sample_rate.clone(),
            sid_model: self.sid_model.clone(),
            video_standard: self.video_standard.clone(),
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout may carry PCM
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "trace")]
fn trace_session(chip: BusSid, config: &Config, writer: Box<dyn Write>) -> Result<Session<BusSid>> {
    let probe = sid_capture::VcdTrace::new(writer, config.video_standard.phi2_hz())
        .context("writing trace header")?;
    Ok(Session::trace(chip, config, Box::new(probe)))
}

#[cfg(not(feature = "trace"))]
fn trace_session(_chip: BusSid, _config: &Config, _writer: Box<dyn Write>) -> Result<Session<BusSid>> {
    Err(SidCaptureError::from(ConfigError::TraceUnavailable).into())
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.options().validate().map_err(SidCaptureError::from)?;
    if io::stdin().is_terminal() {
        return Err(SidCaptureError::InteractiveInput.into());
    }

    debug!(
        filter = %config.filter,
        highpass_hz = config.bandpass.highpass_hz,
        lowpass_hz = config.bandpass.lowpass_hz,
        sample_rate = config.sample_rate,
        sid_model = %config.sid_model,
        video_standard = %config.video_standard,
        "configuration"
    );

    let writer = output::open(&config.output)?;
    let chip = BusSid::new(config.sid_model);
    let mut session = match config.capture {
        CaptureMode::Audio => Session::audio(chip, &config, Box::new(PcmSink::new(writer))),
        CaptureMode::Trace => trace_session(chip, &config, writer)?,
    };

    let mut stream = CommandStream::new(io::stdin().lock());
    session.run(&mut stream).context("capture failed")?;
    session.finish().context("finishing output")?;
    Ok(())
}

/// Errors the operator can fix by changing the invocation
fn wants_help_hint(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SidCaptureError>(),
        Some(SidCaptureError::Config(_) | SidCaptureError::InteractiveInput)
    ) || err.downcast_ref::<ConfigError>().is_some()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sid-capture: {err:#}");
            if wants_help_hint(&err) {
                eprintln!("{HELP_HINT}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_validate() {
        let cli = Cli::parse_from(["sid-capture"]);
        let config = cli.options().validate().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cli_short_options() {
        let cli = Cli::parse_from([
            "sid-capture", "-c", "-f", "none", "-p", "20-15000", "-r", "48000", "-s", "8580", "-v",
            "ntsc",
        ]);
        let config = cli.options().validate().unwrap();
        assert_eq!(config.output, sid_capture::OutputTarget::Stdout);
        assert_eq!(config.filter, sid_capture::FilterMode::None);
        assert_eq!(config.bandpass.highpass_hz, 20);
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.sid_model, sid_capture::SidModel::Mos8580);
        assert_eq!(config.video_standard, sid_capture::VideoStandard::Ntsc);
    }

    #[test]
    fn test_cli_rejects_extra_arguments() {
        assert!(Cli::try_parse_from(["sid-capture", "extra"]).is_err());
        assert!(Cli::try_parse_from(["sid-capture", "-c", "-o", "x.raw"]).is_err());
    }

    #[test]
    fn test_config_errors_get_hint() {
        let err: anyhow::Error = SidCaptureError::from(ConfigError::TraceUnavailable).into();
        assert!(wants_help_hint(&err));
        let broken = io::Error::from(io::ErrorKind::BrokenPipe);
        let err: anyhow::Error = SidCaptureError::from(broken).into();
        assert!(!wants_help_hint(&err));
    }
}
