//! Two-Phase Bus Sequencing
//!
//! Advances the chip under test by whole φ2/φ1 cycles and presents register
//! writes on the multiplexed bus.
//!
//! Bus word layout (16 bits):
//!
//! | Bits   | Signal          |
//! |--------|-----------------|
//! | 15..11 | Register address |
//! | 10..3  | Data byte       |
//! | 2      | φ2 (1 = active) |
//! | 1      | R/W̄ (0 = write) |
//! | 0      | reserved        |
//!
//! Each half-cycle lasts [`CLOCKS_PER_PHASE`] periods of the fast model
//! clock, and the model is evaluated after every single clock edge.

use crate::chip::ChipUnderTest;
use std::io;

/// Fast clock periods per bus phase (24 edges)
pub const CLOCKS_PER_PHASE: usize = 12;
/// Clock edges per full chip cycle
pub const EDGES_PER_CYCLE: u64 = (CLOCKS_PER_PHASE * 2 * 2) as u64;

/// φ2 phase flag
pub const PHI2: u16 = 1 << 2;
/// Read/write line, low for writes
pub const RW_N: u16 = 1 << 1;
/// Reserved line, passed through untouched
pub const RESERVED: u16 = 1 << 0;
/// Position of the data byte
pub const DATA_SHIFT: u32 = 3;
/// Position of the register address
pub const ADDR_SHIFT: u32 = 11;
/// Bits preserved across writes
const HELD_BITS: u16 = PHI2 | RESERVED;

/// Chip-select word: chip selected, I/O area 1 deselected
pub const CHIP_SELECT: u8 = 0b0100;

/// Encode a register write onto the bus
///
/// R/W̄ is driven low; the phase and reserved lines keep their levels.
#[inline]
pub fn encode_write(bus: u16, address: u8, value: u8) -> u16 {
    (u16::from(address & 0x1F) << ADDR_SHIFT) | (u16::from(value) << DATA_SHIFT) | (bus & HELD_BITS)
}

/// Register address field of a bus word
#[inline]
pub fn address_field(bus: u16) -> u8 {
    ((bus >> ADDR_SHIFT) & 0x1F) as u8
}

/// Data field of a bus word
#[inline]
pub fn data_field(bus: u16) -> u8 {
    ((bus >> DATA_SHIFT) & 0xFF) as u8
}

/// Current drive values of the harness-owned lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusState {
    /// Fast clock line
    pub clk: bool,
    /// Multiplexed address/data/phase bus
    pub bus: u16,
    /// Chip-select lines
    pub cs: u8,
}

impl Default for BusState {
    /// Lines idle with R/W̄ high, so nothing is written before the first record
    fn default() -> Self {
        Self {
            clk: false,
            bus: RW_N,
            cs: CHIP_SELECT,
        }
    }
}

/// Observer of every clock edge driven into the chip
pub trait EdgeProbe {
    /// Called after the model has been evaluated for an edge
    fn edge(&mut self, state: &BusState, audio: i32);

    /// Flush buffered output, reporting the first error seen
    fn finish(&mut self) -> io::Result<()>;
}

/// Drives the clock and bus lines of a chip under test
pub struct BusSequencer<C: ChipUnderTest> {
    chip: C,
    state: BusState,
    cycles: u64,
    probe: Option<Box<dyn EdgeProbe>>,
}

impl<C: ChipUnderTest> BusSequencer<C> {
    /// Take ownership of a chip and drive its lines to their idle levels
    pub fn new(mut chip: C) -> Self {
        let state = BusState::default();
        chip.set_clock(state.clk);
        chip.set_bus(state.bus);
        chip.set_chip_select(state.cs);
        Self {
            chip,
            state,
            cycles: 0,
            probe: None,
        }
    }

    /// Attach an edge observer
    pub fn with_probe(mut self, probe: Box<dyn EdgeProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Run one full chip cycle (φ2 then φ1) and return the raw output
    pub fn advance_cycle(&mut self) -> i32 {
        self.set_bus(self.state.bus | PHI2);
        self.clock_phase();
        self.set_bus(self.state.bus & !PHI2);
        self.clock_phase();
        self.cycles += 1;
        self.chip.read_audio_output()
    }

    /// Present a register write for the next cycle's φ2 half
    pub fn latch_write(&mut self, address: u8, value: u8) {
        self.set_bus(encode_write(self.state.bus, address, value));
    }

    /// Completed chip cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Current line levels
    pub fn state(&self) -> &BusState {
        &self.state
    }

    /// Shared access to the chip
    pub fn chip(&self) -> &C {
        &self.chip
    }

    /// Finalize the chip and flush the probe, returning the chip
    pub fn finalize(mut self) -> io::Result<C> {
        self.chip.finalize();
        if let Some(probe) = self.probe.as_mut() {
            probe.finish()?;
        }
        Ok(self.chip)
    }

    fn set_bus(&mut self, bits: u16) {
        self.state.bus = bits;
        self.chip.set_bus(bits);
    }

    fn clock_phase(&mut self) {
        for _ in 0..CLOCKS_PER_PHASE {
            self.edge(true);
            self.edge(false);
        }
    }

    fn edge(&mut self, level: bool) {
        self.state.clk = level;
        self.chip.set_clock(level);
        self.chip.evaluate();
        if let Some(probe) = self.probe.as_mut() {
            probe.edge(&self.state, self.chip.read_audio_output());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ScriptedChip;

    #[test]
    fn test_encode_write_fields() {
        let word = encode_write(0, 0x04, 0x21);
        assert_eq!(address_field(word), 0x04);
        assert_eq!(data_field(word), 0x21);
    }

    #[test]
    fn test_encode_write_independent_of_prior_bits() {
        for prior in [0x0000u16, 0xFFFF, PHI2, RW_N, RESERVED, 0xF80F] {
            let word = encode_write(prior, 0x04, 0x21);
            assert_eq!(address_field(word), 0x04);
            assert_eq!(data_field(word), 0x21);
            assert_eq!(word & HELD_BITS, prior & HELD_BITS);
            assert_eq!(word & RW_N, 0);
        }
    }

    #[test]
    fn test_encode_write_masks_address_to_five_bits() {
        let word = encode_write(0, 0xFF, 0x00);
        assert_eq!(address_field(word), 0x1F);
    }

    #[test]
    fn test_advance_cycle_returns_scripted_output() {
        let mut seq = BusSequencer::new(ScriptedChip::new(vec![5, -7, 11]));
        assert_eq!(seq.advance_cycle(), 5);
        assert_eq!(seq.advance_cycle(), -7);
        assert_eq!(seq.advance_cycle(), 11);
        assert_eq!(seq.cycles(), 3);
    }

    #[test]
    fn test_every_edge_is_evaluated() {
        let mut seq = BusSequencer::new(ScriptedChip::new(vec![0]));
        seq.advance_cycle();
        seq.advance_cycle();
        assert_eq!(seq.chip().evaluations(), 2 * EDGES_PER_CYCLE);
        assert!(!seq.state().clk);
        assert_eq!(seq.state().bus & PHI2, 0);
    }

    #[test]
    fn test_idle_bus_writes_nothing() {
        assert_eq!(BusState::default().bus, RW_N);
        let mut seq = BusSequencer::new(ScriptedChip::new(vec![0]));
        for _ in 0..10 {
            seq.advance_cycle();
        }
        assert!(seq.chip().writes().is_empty());
        assert_eq!(seq.cycles(), 10);
    }

    #[test]
    fn test_latched_write_reaches_chip_next_cycle() {
        let mut seq = BusSequencer::new(ScriptedChip::new(vec![0]));
        seq.advance_cycle();
        seq.latch_write(0x18, 0x0F);
        assert!(seq.chip().writes().is_empty());

        seq.advance_cycle();
        let writes = seq.chip().writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].cycle, 2);
        assert_eq!(writes[0].write.address, 0x18);
        assert_eq!(writes[0].write.value, 0x0F);
    }

    #[test]
    fn test_chip_select_is_held() {
        let mut seq = BusSequencer::new(ScriptedChip::new(vec![0]));
        seq.latch_write(0x04, 0x21);
        seq.advance_cycle();
        seq.latch_write(0x05, 0x09);
        assert_eq!(seq.state().cs, CHIP_SELECT);
        assert_eq!(seq.chip().chip_select(), CHIP_SELECT);
    }

    struct CountingProbe {
        edges: std::rc::Rc<std::cell::Cell<u64>>,
    }

    impl EdgeProbe for CountingProbe {
        fn edge(&mut self, _state: &BusState, _audio: i32) {
            self.edges.set(self.edges.get() + 1);
        }

        fn finish(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_probe_sees_every_edge() {
        let edges = std::rc::Rc::new(std::cell::Cell::new(0));
        let probe = CountingProbe {
            edges: edges.clone(),
        };
        let mut seq = BusSequencer::new(ScriptedChip::new(vec![0])).with_probe(Box::new(probe));
        for _ in 0..3 {
            seq.advance_cycle();
        }
        seq.finalize().expect("finalize");
        assert_eq!(edges.get(), 3 * EDGES_PER_CYCLE);
    }
}
