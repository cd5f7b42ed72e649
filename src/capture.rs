//! Capture Session
//!
//! The single control loop of a run. Each record's wait cycles are clocked
//! through the bus one at a time; in audio mode every cycle's output goes
//! through the external filter and the resampler before the next cycle
//! starts. The record's write is latched after its waits.

use crate::bus::{BusSequencer, EdgeProbe};
use crate::bypass::strip_filter_bits;
use crate::chip::ChipUnderTest;
use crate::command::{CommandStream, RegisterWrite};
use crate::config::Config;
use crate::filter::ExternalFilter;
use crate::resampler::Resampler;
use crate::sink::SampleSink;
use crate::Result;
use std::io::BufRead;
use tracing::{debug, info};

/// Totals reported at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureStats {
    /// Writes latched onto the bus
    pub writes: u64,
    /// Chip cycles run
    pub cycles: u64,
    /// Samples written to the sink
    pub samples: u64,
    /// Input ended on a malformed record
    pub truncated: bool,
}

/// Filter, rate converter and sink for audio capture
struct AudioPath {
    filter: ExternalFilter,
    resampler: Resampler,
    sink: Box<dyn SampleSink>,
}

impl AudioPath {
    fn push(&mut self, raw: i32) -> Result<()> {
        let sample = self.filter.process(raw);
        if self.resampler.clock() {
            self.sink.write_sample(sample)?;
        }
        Ok(())
    }
}

/// A chip under test with its post-processing chain
pub struct Session<C: ChipUnderTest> {
    sequencer: BusSequencer<C>,
    audio: Option<AudioPath>,
    strip_filter_bits: bool,
    writes: u64,
    truncated: bool,
}

impl<C: ChipUnderTest> Session<C> {
    /// Capture filtered, resampled audio into `sink`
    pub fn audio(chip: C, config: &Config, sink: Box<dyn SampleSink>) -> Self {
        let filter = config.external_filter();
        if let Some(c) = filter.coefficients() {
            debug!(
                mul_hp = c.hp.mul,
                shift_hp = c.hp.shift,
                mul_lp = c.lp.mul,
                shift_lp = c.lp.shift,
                "external filter coefficients"
            );
        }
        Session {
            sequencer: BusSequencer::new(chip),
            audio: Some(AudioPath {
                filter,
                resampler: config.resampler(),
                sink,
            }),
            strip_filter_bits: config.strips_filter_bits(),
            writes: 0,
            truncated: false,
        }
    }

    /// Capture every clock edge into `probe` instead of audio
    pub fn trace(chip: C, config: &Config, probe: Box<dyn EdgeProbe>) -> Self {
        Session {
            sequencer: BusSequencer::new(chip).with_probe(probe),
            audio: None,
            strip_filter_bits: config.strips_filter_bits(),
            writes: 0,
            truncated: false,
        }
    }

    /// Run a record's wait cycles, then latch its write
    pub fn apply(&mut self, record: RegisterWrite) -> Result<()> {
        for _ in 0..record.wait_cycles {
            self.cycle()?;
        }

        let value = if self.strip_filter_bits {
            strip_filter_bits(record.address, record.value)
        } else {
            record.value
        };
        self.sequencer.latch_write(record.address, value);
        self.writes += 1;
        Ok(())
    }

    /// Apply every record until the stream ends
    pub fn run<R: BufRead>(&mut self, stream: &mut CommandStream<R>) -> Result<()> {
        while let Some(record) = stream.next_record()? {
            self.apply(record)?;
        }
        self.truncated |= stream.is_truncated();
        Ok(())
    }

    /// Shared access to the chip
    pub fn chip(&self) -> &C {
        self.sequencer.chip()
    }

    /// Chip cycles run so far
    pub fn cycles(&self) -> u64 {
        self.sequencer.cycles()
    }

    /// Finalize the chip and flush all output
    ///
    /// The chip is finalized even when flushing fails; the first error wins.
    pub fn finish(self) -> Result<CaptureStats> {
        let cycles = self.sequencer.cycles();
        let (flushed, samples) = match self.audio {
            Some(mut audio) => (audio.sink.finish(), audio.sink.samples_written()),
            None => (Ok(()), 0),
        };
        let finalized = self.sequencer.finalize();
        flushed?;
        finalized?;

        let stats = CaptureStats {
            writes: self.writes,
            cycles,
            samples,
            truncated: self.truncated,
        };
        if stats.truncated {
            info!(
                writes = stats.writes,
                cycles = stats.cycles,
                "capture stopped early on malformed input"
            );
        }
        debug!(
            writes = stats.writes,
            cycles = stats.cycles,
            samples = stats.samples,
            "capture complete"
        );
        Ok(stats)
    }

    fn cycle(&mut self) -> Result<()> {
        let raw = self.sequencer.advance_cycle();
        if let Some(audio) = self.audio.as_mut() {
            audio.push(raw)?;
        }
        Ok(())
    }
}
