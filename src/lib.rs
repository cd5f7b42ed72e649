//! SID Bus Capture Harness
//!
//! Replays a log of timed register writes into a SID model through a
//! cycle-accurate two-phase bus, then turns the chip's per-cycle output into
//! raw PCM by emulating the C64's external RC filter and decimating to a
//! target sample rate.
//!
//! # Pipeline
//! `CommandStream` → `BusSequencer` → `ExternalFilter` → `Resampler` → `SampleSink`
//!
//! # Crate feature flags
//! - `trace` (default): Value Change Dump capture of every clock edge (`trace`)
//!
//! # Quick start
//! ```no_run
//! use sid_capture::{BusSid, CommandStream, Config, PcmSink, Session};
//! let config = Config::default();
//! let chip = BusSid::new(config.sid_model);
//! let sink = PcmSink::new(std::fs::File::create("out.raw").unwrap());
//! let mut session = Session::audio(chip, &config, Box::new(sink));
//! let mut stream = CommandStream::new("0 24 15\n1000 4 33\n".as_bytes());
//! session.run(&mut stream).unwrap();
//! let stats = session.finish().unwrap();
//! println!("{} samples", stats.samples);
//! ```

pub mod bus; // Two-phase bus sequencing
pub mod bypass; // Internal filter bypass mask
pub mod capture; // Capture loop
pub mod chip; // Chip-under-test interface and models
pub mod clock; // Chip clock timing
pub mod command; // Input record stream
pub mod config; // Option validation
pub mod filter; // External RC filter
pub mod output; // Output destinations
pub mod resampler; // Rate conversion
pub mod sink; // PCM serialization
#[cfg(feature = "trace")]
pub mod trace; // Waveform trace capture

use std::path::PathBuf;

/// Error types for capture runs
#[derive(thiserror::Error, Debug)]
pub enum SidCaptureError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// Output destination could not be opened
    #[error("cannot open '{}': {source}", .path.display())]
    Output {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// IO error while reading input or writing output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Standard input is attached to a terminal
    #[error("standard input is a terminal")]
    InteractiveInput,
}

/// Result type for capture operations
pub type Result<T> = std::result::Result<T, SidCaptureError>;

// Public API exports
pub use bus::{BusSequencer, BusState, EdgeProbe};
pub use capture::{CaptureStats, Session};
pub use chip::{BusSid, ChipUnderTest, ScriptedChip, SidModel};
pub use clock::VideoStandard;
pub use command::{CommandStream, RegisterWrite};
pub use config::{CaptureMode, Config, ConfigError, FilterMode, Options, OutputTarget};
pub use filter::{ExternalFilter, FilterCoefficients};
pub use resampler::Resampler;
pub use sink::{PcmSink, SampleSink};
#[cfg(feature = "trace")]
pub use trace::VcdTrace;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_error_names_path() {
        let err = SidCaptureError::Output {
            path: PathBuf::from("out/sid.raw"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cannot open 'out/sid.raw': "));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: SidCaptureError = ConfigError::TraceUnavailable.into();
        assert_eq!(err.to_string(), ConfigError::TraceUnavailable.to_string());
    }
}
