//! Scripted chip stub
//!
//! Completes cycles exactly like a bus-attached device but produces a fixed,
//! repeating output sequence and records what it observed on the bus.

use super::{BusDecoder, BusWrite, ChipUnderTest};

/// A write observed by the stub, tagged with the cycle that latched it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedWrite {
    /// 1-based cycle number in which the write completed
    pub cycle: u64,
    /// Decoded write
    pub write: BusWrite,
}

/// Deterministic chip model with a scripted output sequence
///
/// Cycle `n` (1-based) outputs `script[(n - 1) % script.len()]`; an empty
/// script outputs silence.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChip {
    script: Vec<i32>,
    decoder: BusDecoder,
    cycles: u64,
    evaluations: u64,
    output: i32,
    writes: Vec<ScriptedWrite>,
    finalized: bool,
}

impl ScriptedChip {
    /// Create a stub that plays `script` cycle by cycle
    pub fn new(script: Vec<i32>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Number of `evaluate` calls
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Every write completed on the bus, one entry per cycle it was held
    pub fn writes(&self) -> &[ScriptedWrite] {
        &self.writes
    }

    /// Writes with repeats of a held bus word collapsed onto the first cycle
    pub fn distinct_writes(&self) -> Vec<ScriptedWrite> {
        let mut out: Vec<ScriptedWrite> = Vec::new();
        let mut previous: Option<ScriptedWrite> = None;
        for &w in &self.writes {
            let repeat = previous
                .map(|p| p.write == w.write && p.cycle + 1 == w.cycle)
                .unwrap_or(false);
            if !repeat {
                out.push(w);
            }
            previous = Some(w);
        }
        out
    }

    /// Current chip-select word
    pub fn chip_select(&self) -> u8 {
        self.decoder.chip_select()
    }

    /// Whether `finalize` was called
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl ChipUnderTest for ScriptedChip {
    fn set_clock(&mut self, level: bool) {
        self.decoder.set_clock(level);
    }

    fn set_bus(&mut self, bits: u16) {
        self.decoder.set_bus(bits);
    }

    fn set_chip_select(&mut self, bits: u8) {
        self.decoder.set_chip_select(bits);
    }

    fn evaluate(&mut self) {
        self.evaluations += 1;
        let Some(cycle) = self.decoder.evaluate() else {
            return;
        };

        self.cycles += 1;
        if let Some(write) = cycle.write {
            self.writes.push(ScriptedWrite {
                cycle: self.cycles,
                write,
            });
        }
        self.output = if self.script.is_empty() {
            0
        } else {
            self.script[((self.cycles - 1) % self.script.len() as u64) as usize]
        };
    }

    fn read_audio_output(&self) -> i32 {
        self.output
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }
}
