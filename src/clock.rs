//! Chip Clock Timing
//!
//! Reference φ2 frequencies for the supported video standards.

use std::fmt;
use std::str::FromStr;

/// φ2 frequency of a PAL C64 (Hz)
pub const PHI2_HZ_PAL: u32 = 985_248;
/// φ2 frequency of an NTSC C64 (Hz)
pub const PHI2_HZ_NTSC: u32 = 1_022_730;
/// φ2 frequency of a PAL-N (Drean) C64 (Hz)
pub const PHI2_HZ_PAL_N: u32 = 1_023_440;

/// Video standard of the host machine, which fixes the chip cycle rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoStandard {
    /// PAL (default)
    #[default]
    Pal,
    /// NTSC
    Ntsc,
    /// PAL-N
    PalN,
}

impl VideoStandard {
    /// Chip cycle frequency in Hz
    pub fn phi2_hz(self) -> u32 {
        match self {
            VideoStandard::Pal => PHI2_HZ_PAL,
            VideoStandard::Ntsc => PHI2_HZ_NTSC,
            VideoStandard::PalN => PHI2_HZ_PAL_N,
        }
    }

    /// Duration of one chip cycle in seconds
    pub fn cycle_period(self) -> f64 {
        1.0 / self.phi2_hz() as f64
    }

    /// Option spelling of this standard
    pub fn as_str(self) -> &'static str {
        match self {
            VideoStandard::Pal => "pal",
            VideoStandard::Ntsc => "ntsc",
            VideoStandard::PalN => "pal-n",
        }
    }
}

impl FromStr for VideoStandard {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pal" => Ok(VideoStandard::Pal),
            "ntsc" => Ok(VideoStandard::Ntsc),
            "pal-n" => Ok(VideoStandard::PalN),
            _ => Err(()),
        }
    }
}

impl fmt::Display for VideoStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
