//! Internal Filter Bypass
//!
//! Strips the filter routing and filter mode bits from writes so the chip's
//! own filter stays out of the signal path.

use bitflags::bitflags;

/// Resonance (7..4) and filter routing (3..0)
pub const RES_FILT: u8 = 0x17;
/// Voice 3 off, filter mode (6..4) and master volume (3..0)
pub const MODE_VOL: u8 = 0x18;

bitflags! {
    /// Filter routing bits of register 0x17
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FilterRouting: u8 {
        /// Route voice 1 through the filter
        const FILT1 = 0x01;
        /// Route voice 2 through the filter
        const FILT2 = 0x02;
        /// Route voice 3 through the filter
        const FILT3 = 0x04;
        /// Route the external input through the filter
        const FILTEX = 0x08;
    }
}

bitflags! {
    /// Mode bits of register 0x18 (volume lives in the low nibble)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FilterModes: u8 {
        /// Low-pass output
        const LP = 0x10;
        /// Band-pass output
        const BP = 0x20;
        /// High-pass output
        const HP = 0x40;
        /// Disconnect voice 3 from the direct path
        const VOICE3_OFF = 0x80;
    }
}

/// Remove filter control bits from a register write
///
/// Resonance, voice 3 off and volume are kept. Every other register passes
/// through unchanged.
pub fn strip_filter_bits(address: u8, value: u8) -> u8 {
    match address {
        RES_FILT => value & !FilterRouting::all().bits(),
        MODE_VOL => {
            let modes = FilterModes::LP | FilterModes::BP | FilterModes::HP;
            value & !modes.bits()
        }
        _ => value,
    }
}
