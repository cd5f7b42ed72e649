//! Capture Configuration
//!
//! Raw option strings are collected into [`Options`] and validated once into
//! an immutable [`Config`]. Every later stage is built from the `Config`;
//! nothing is reconfigured while cycles run.

use crate::chip::SidModel;
use crate::clock::VideoStandard;
use crate::filter::{ExternalFilter, FilterCoefficients};
use crate::resampler::Resampler;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Highest accepted external filter cutoff in Hz
pub const MAX_CUTOFF_HZ: u32 = 20_000;

/// Default output file for audio capture
pub const DEFAULT_AUDIO_FILE: &str = "sid_capture.raw";
/// Default output file for trace capture
pub const DEFAULT_TRACE_FILE: &str = "sid_capture.vcd";

/// Configuration errors, each naming the offending option
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("option '{option}' has invalid argument '{value}'")]
    InvalidArgument { option: &'static str, value: String },

    #[error("sample rate {rate} Hz must be below the chip clock of {phi2_hz} Hz")]
    SampleRateTooHigh { rate: u32, phi2_hz: u32 },

    #[error("trace capture is not available in this build")]
    TraceUnavailable,
}

impl ConfigError {
    fn invalid(option: &'static str, value: &str) -> Self {
        ConfigError::InvalidArgument {
            option,
            value: value.to_string(),
        }
    }
}

/// Which filter stages are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Chip filter only
    Sid,
    /// External filter only
    Ext,
    /// Both stages
    #[default]
    All,
    /// Neither stage
    None,
}

impl FilterMode {
    /// Whether the chip's own filter is left in the signal path
    pub fn internal(self) -> bool {
        matches!(self, FilterMode::Sid | FilterMode::All)
    }

    /// Whether the external filter emulation runs
    pub fn external(self) -> bool {
        matches!(self, FilterMode::Ext | FilterMode::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::Sid => "sid",
            FilterMode::Ext => "ext",
            FilterMode::All => "all",
            FilterMode::None => "none",
        }
    }
}

impl FromStr for FilterMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sid" => Ok(FilterMode::Sid),
            "ext" => Ok(FilterMode::Ext),
            "all" => Ok(FilterMode::All),
            "none" => Ok(FilterMode::None),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External filter band edges in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bandpass {
    pub highpass_hz: u32,
    pub lowpass_hz: u32,
}

impl Default for Bandpass {
    fn default() -> Self {
        Bandpass {
            highpass_hz: 10,
            lowpass_hz: 16_000,
        }
    }
}

impl Bandpass {
    /// Parse `<from>-<to>`, requiring `1 <= from < to <= 20000`
    pub fn parse(value: &str) -> Option<Self> {
        let (from, to) = value.split_once('-')?;
        let highpass_hz: u32 = from.parse().ok()?;
        let lowpass_hz: u32 = to.parse().ok()?;
        let valid = highpass_hz >= 1 && highpass_hz < lowpass_hz && lowpass_hz <= MAX_CUTOFF_HZ;
        valid.then_some(Bandpass {
            highpass_hz,
            lowpass_hz,
        })
    }
}

/// Where output bytes go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// What is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Filtered and resampled PCM
    #[default]
    Audio,
    /// Value Change Dump of every clock edge
    Trace,
}

/// Unvalidated option values as given on the command line
#[derive(Debug, Clone)]
pub struct Options {
    pub stdout: bool,
    pub output: Option<PathBuf>,
    pub trace: bool,
    pub filter: String,
    pub bandpass: String,
    pub sample_rate: String,
    pub sid_model: String,
    pub video_standard: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            stdout: false,
            output: None,
            trace: false,
            filter: "all".to_string(),
            bandpass: "10-16000".to_string(),
            sample_rate: "96000".to_string(),
            sid_model: "6581".to_string(),
            video_standard: "pal".to_string(),
        }
    }
}

impl Options {
    /// Check every option and build the run configuration
    pub fn validate(&self) -> Result<Config, ConfigError> {
        let filter = self
            .filter
            .parse::<FilterMode>()
            .map_err(|_| ConfigError::invalid("--filter", &self.filter))?;
        let bandpass = Bandpass::parse(&self.bandpass)
            .ok_or_else(|| ConfigError::invalid("--bandpass", &self.bandpass))?;
        let sample_rate = self
            .sample_rate
            .parse::<u32>()
            .ok()
            .filter(|rate| *rate > 0)
            .ok_or_else(|| ConfigError::invalid("--sample-rate", &self.sample_rate))?;
        let sid_model = self
            .sid_model
            .parse::<SidModel>()
            .map_err(|_| ConfigError::invalid("--sid-model", &self.sid_model))?;
        let video_standard = self
            .video_standard
            .parse::<VideoStandard>()
            .map_err(|_| ConfigError::invalid("--video-standard", &self.video_standard))?;

        let phi2_hz = video_standard.phi2_hz();
        if sample_rate >= phi2_hz {
            return Err(ConfigError::SampleRateTooHigh {
                rate: sample_rate,
                phi2_hz,
            });
        }

        let capture = if self.trace {
            if !cfg!(feature = "trace") {
                return Err(ConfigError::TraceUnavailable);
            }
            CaptureMode::Trace
        } else {
            CaptureMode::Audio
        };

        let output = if self.stdout {
            OutputTarget::Stdout
        } else {
            let default = match capture {
                CaptureMode::Audio => DEFAULT_AUDIO_FILE,
                CaptureMode::Trace => DEFAULT_TRACE_FILE,
            };
            OutputTarget::File(self.output.clone().unwrap_or_else(|| PathBuf::from(default)))
        };

        Ok(Config {
            output,
            capture,
            filter,
            bandpass,
            sample_rate,
            sid_model,
            video_standard,
        })
    }
}

/// Validated, immutable run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub output: OutputTarget,
    pub capture: CaptureMode,
    pub filter: FilterMode,
    pub bandpass: Bandpass,
    pub sample_rate: u32,
    pub sid_model: SidModel,
    pub video_standard: VideoStandard,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output: OutputTarget::File(PathBuf::from(DEFAULT_AUDIO_FILE)),
            capture: CaptureMode::Audio,
            filter: FilterMode::default(),
            bandpass: Bandpass::default(),
            sample_rate: 96_000,
            sid_model: SidModel::default(),
            video_standard: VideoStandard::default(),
        }
    }
}

impl Config {
    /// Chip cycle duration in seconds
    pub fn cycle_period(&self) -> f64 {
        self.video_standard.cycle_period()
    }

    /// Output sample duration in seconds
    pub fn sample_period(&self) -> f64 {
        1.0 / f64::from(self.sample_rate)
    }

    /// Whether writes must have their filter bits stripped
    pub fn strips_filter_bits(&self) -> bool {
        !self.filter.internal()
    }

    /// External filter for this run, bypassed when disabled
    pub fn external_filter(&self) -> ExternalFilter {
        if self.filter.external() {
            ExternalFilter::new(FilterCoefficients::from_cutoffs_hz(
                self.bandpass.highpass_hz,
                self.bandpass.lowpass_hz,
                self.cycle_period(),
            ))
        } else {
            ExternalFilter::bypass()
        }
    }

    /// Rate converter for this run
    pub fn resampler(&self) -> Resampler {
        Resampler::new(self.cycle_period(), self.sample_period())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Options {
        Options::default()
    }

    #[test]
    fn test_defaults_validate() {
        let config = options().validate().unwrap();
        assert_eq!(config, Config::default());
        assert!(config.filter.internal() && config.filter.external());
        assert!(!config.strips_filter_bits());
    }

    #[test]
    fn test_filter_modes() {
        for (name, internal, external) in [
            ("sid", true, false),
            ("ext", false, true),
            ("all", true, true),
            ("none", false, false),
        ] {
            let config = Options {
                filter: name.to_string(),
                ..options()
            }
            .validate()
            .unwrap();
            assert_eq!(config.filter.internal(), internal, "{name}");
            assert_eq!(config.filter.external(), external, "{name}");
            assert_eq!(config.external_filter().is_bypass(), !external, "{name}");
        }
    }

    #[test]
    fn test_invalid_filter_names_option() {
        let err = Options {
            filter: "both".to_string(),
            ..options()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "option '--filter' has invalid argument 'both'");
    }

    #[test]
    fn test_bandpass_bounds() {
        assert_eq!(
            Bandpass::parse("1-20000"),
            Some(Bandpass {
                highpass_hz: 1,
                lowpass_hz: 20_000
            })
        );
        for bad in ["0-100", "100-100", "200-100", "10-20001", "10", "a-b", "-5-10", ""] {
            assert_eq!(Bandpass::parse(bad), None, "{bad}");
        }
    }

    #[test]
    fn test_sample_rate_rules() {
        for bad in ["0", "-1", "fast", "44.1"] {
            let err = Options {
                sample_rate: bad.to_string(),
                ..options()
            }
            .validate()
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidArgument { option: "--sample-rate", .. }));
        }

        let err = Options {
            sample_rate: "985248".to_string(),
            ..options()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::SampleRateTooHigh {
                rate: 985_248,
                phi2_hz: 985_248
            }
        );
    }

    #[test]
    fn test_model_and_standard() {
        let config = Options {
            sid_model: "8580".to_string(),
            video_standard: "ntsc".to_string(),
            ..options()
        }
        .validate()
        .unwrap();
        assert_eq!(config.sid_model, SidModel::Mos8580);
        approx::assert_relative_eq!(config.cycle_period(), 1.0 / 1_022_730.0);

        assert!(Options {
            video_standard: "secam".to_string(),
            ..options()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_output_targets() {
        let config = Options {
            stdout: true,
            ..options()
        }
        .validate()
        .unwrap();
        assert_eq!(config.output, OutputTarget::Stdout);

        let config = Options {
            output: Some(PathBuf::from("out.raw")),
            ..options()
        }
        .validate()
        .unwrap();
        assert_eq!(config.output, OutputTarget::File(PathBuf::from("out.raw")));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn test_trace_mode_default_file() {
        let config = Options {
            trace: true,
            ..options()
        }
        .validate()
        .unwrap();
        assert_eq!(config.capture, CaptureMode::Trace);
        assert_eq!(config.output, OutputTarget::File(PathBuf::from(DEFAULT_TRACE_FILE)));
    }
}
