//! Sample sink abstraction for PCM output
//!
//! The capture loop hands every emitted sample to a [`SampleSink`]. The
//! crate ships [`PcmSink`], which writes raw headerless 24-bit big-endian
//! mono PCM to any [`Write`] destination.
//!
//! # Implementing a Custom Sink
//!
//! ```
//! use sid_capture::sink::SampleSink;
//! use std::io;
//!
//! #[derive(Default)]
//! struct Collect(Vec<i32>);
//!
//! impl SampleSink for Collect {
//!     fn write_sample(&mut self, sample: i32) -> io::Result<()> {
//!         self.0.push(sample);
//!         Ok(())
//!     }
//!
//!     fn finish(&mut self) -> io::Result<()> {
//!         Ok(())
//!     }
//!
//!     fn samples_written(&self) -> u64 {
//!         self.0.len() as u64
//!     }
//! }
//! ```

use std::io::{self, Write};

/// Bytes per output sample
pub const BYTES_PER_SAMPLE: usize = 3;

/// Destination for emitted samples
pub trait SampleSink {
    /// Serialize one sample
    fn write_sample(&mut self, sample: i32) -> io::Result<()>;

    /// Flush any buffered output
    fn finish(&mut self) -> io::Result<()>;

    /// Samples accepted so far
    fn samples_written(&self) -> u64;
}

impl<S: SampleSink + ?Sized> SampleSink for Box<S> {
    fn write_sample(&mut self, sample: i32) -> io::Result<()> {
        (**self).write_sample(sample)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }

    fn samples_written(&self) -> u64 {
        (**self).samples_written()
    }
}

/// Raw 24-bit big-endian PCM writer
///
/// Only the low 24 bits of each sample are written, so values beyond the
/// 24-bit range wrap.
pub struct PcmSink<W: Write> {
    writer: W,
    samples: u64,
}

impl<W: Write> PcmSink<W> {
    pub fn new(writer: W) -> Self {
        PcmSink { writer, samples: 0 }
    }

    /// Recover the destination
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Big-endian bytes of the low 24 bits of `sample`
#[inline]
pub fn encode_sample(sample: i32) -> [u8; BYTES_PER_SAMPLE] {
    let bits = sample as u32;
    [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]
}

impl<W: Write> SampleSink for PcmSink<W> {
    fn write_sample(&mut self, sample: i32) -> io::Result<()> {
        self.writer.write_all(&encode_sample(sample))?;
        self.samples += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn samples_written(&self) -> u64 {
        self.samples
    }
}
