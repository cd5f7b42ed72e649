//! Reference SID attached to the bus
//!
//! Decodes bus cycles and steps a [`resid::Sid`] once per completed cycle,
//! applying any write that was presented during φ2 first. The emulator's
//! own output stage is switched off; the harness runs its external filter
//! on the raw mixer output.

use super::{BusDecoder, ChipUnderTest};
use resid::{ChipModel, Sid};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Bits the 16-bit emulator output is shifted up to fill the 24-bit range
const OUTPUT_SHIFT: u32 = 8;

/// SID chip revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidModel {
    /// MOS 6581 (default)
    #[default]
    Mos6581,
    /// MOS 8580
    Mos8580,
}

impl SidModel {
    /// Option spelling of this model
    pub fn as_str(self) -> &'static str {
        match self {
            SidModel::Mos6581 => "6581",
            SidModel::Mos8580 => "8580",
        }
    }
}

impl From<SidModel> for ChipModel {
    fn from(model: SidModel) -> Self {
        match model {
            SidModel::Mos6581 => ChipModel::Mos6581,
            SidModel::Mos8580 => ChipModel::Mos8580,
        }
    }
}

impl FromStr for SidModel {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "6581" => Ok(SidModel::Mos6581),
            "8580" => Ok(SidModel::Mos8580),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SidModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reSID core behind a pin-level interface
pub struct BusSid {
    sid: Sid,
    model: SidModel,
    decoder: BusDecoder,
    cycles: u64,
    writes: u64,
}

impl BusSid {
    /// Power up a chip of the given revision
    pub fn new(model: SidModel) -> Self {
        debug!(model = %model, "powering up reference SID");
        let mut sid = Sid::new(model.into());
        sid.enable_external_filter(false);
        Self {
            sid,
            model,
            decoder: BusDecoder::new(),
            cycles: 0,
            writes: 0,
        }
    }

    pub fn model(&self) -> SidModel {
        self.model
    }

    /// Completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Writes applied to the core
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl ChipUnderTest for BusSid {
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
        let Some(cycle) = self.decoder.evaluate() else {
            return;
        };
        if let Some(write) = cycle.write {
            self.sid.write(write.address, write.value);
            self.writes += 1;
        }
        self.sid.clock();
        self.cycles += 1;
    }

    fn read_audio_output(&self) -> i32 {
        i32::from(self.sid.output()) << OUTPUT_SHIFT
    }

    fn finalize(&mut self) {
        debug!(
            model = %self.model,
            cycles = self.cycles,
            bus_writes = self.writes,
            "reference SID finalized"
        );
    }
}
