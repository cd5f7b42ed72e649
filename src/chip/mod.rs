//! Chip-Under-Test Interface
//!
//! The harness drives a device only through its pins: a clock line, the
//! multiplexed address/data/phase bus and the chip-select lines. Any model
//! that implements [`ChipUnderTest`] can be replayed, from the reference
//! SID core to a scripted stub used in tests.
//!
//! Implementations:
//! - `bus_sid` - Reference SID core attached to the bus
//! - `scripted` - Deterministic stub with a scripted output sequence

pub mod bus_sid;
pub mod scripted;

pub use bus_sid::{BusSid, SidModel};
pub use scripted::ScriptedChip;

use crate::bus::{address_field, data_field, PHI2, RW_N};

/// Active-low chip select bit in the chip-select word
pub const CS_N: u8 = 0b0001;

/// Pin-level capability interface of a chip model
///
/// The harness sets input lines, then calls [`evaluate`](Self::evaluate)
/// once after every clock edge. Models are free to react at edge
/// granularity finer than the bus phase.
pub trait ChipUnderTest {
    /// Drive the clock line
    fn set_clock(&mut self, level: bool);

    /// Drive the bus lines
    fn set_bus(&mut self, bits: u16);

    /// Drive the chip-select lines
    fn set_chip_select(&mut self, bits: u8);

    /// Settle internal logic after an input change
    fn evaluate(&mut self);

    /// Current audio output as a signed 24-bit value
    fn read_audio_output(&self) -> i32;

    /// Release the model at end of run
    fn finalize(&mut self) {}
}

/// A register write decoded from the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusWrite {
    /// Register address (5 bits)
    pub address: u8,
    /// Data byte
    pub value: u8,
}

/// A chip cycle completed on the bus (φ2 falling)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusCycle {
    /// Write presented during the φ2 half of the cycle, if any
    pub write: Option<BusWrite>,
}

/// Tracks pin levels and reports completed bus cycles
///
/// Bus lines are sampled on rising clock edges. A cycle completes on the
/// first rising edge that sees φ2 low after it was high; a write is
/// reported when the chip was selected with R/W̄ low during φ2.
#[derive(Debug, Clone, Default)]
pub struct BusDecoder {
    clk: bool,
    bus: u16,
    cs: u8,
    last_clk: bool,
    last_phi2: bool,
    latched: Option<BusWrite>,
}

impl BusDecoder {
    /// Create a decoder with all lines low
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the clock level
    pub fn set_clock(&mut self, level: bool) {
        self.clk = level;
    }

    /// Record the bus word
    pub fn set_bus(&mut self, bits: u16) {
        self.bus = bits;
    }

    /// Record the chip-select word
    pub fn set_chip_select(&mut self, bits: u8) {
        self.cs = bits;
    }

    /// Current bus word
    pub fn bus(&self) -> u16 {
        self.bus
    }

    /// Current chip-select word
    pub fn chip_select(&self) -> u8 {
        self.cs
    }

    /// Process the current pin levels
    ///
    /// Returns the completed cycle when this evaluation ends one.
    pub fn evaluate(&mut self) -> Option<BusCycle> {
        let rising = self.clk && !self.last_clk;
        self.last_clk = self.clk;
        if !rising {
            return None;
        }

        let phi2 = self.bus & PHI2 != 0;
        if phi2 {
            self.latched = self.decode_write();
        }

        let completed = self.last_phi2 && !phi2;
        self.last_phi2 = phi2;

        completed.then(|| BusCycle {
            write: self.latched.take(),
        })
    }

    fn decode_write(&self) -> Option<BusWrite> {
        let selected = self.cs & CS_N == 0;
        let writing = self.bus & RW_N == 0;
        (selected && writing).then(|| BusWrite {
            address: address_field(self.bus),
            value: data_field(self.bus),
        })
    }
}
