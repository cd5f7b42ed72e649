//! Output Rate Conversion
//!
//! Nearest-sample decimation from the chip cycle rate to the output rate
//! using a time accumulator. No band-limiting is applied.

/// Time accumulator selecting which cycles emit an output sample
#[derive(Debug, Clone)]
pub struct Resampler {
    cycle_period: f64,
    sample_period: f64,
    accumulated: f64,
}

impl Resampler {
    /// Create a resampler for the given periods in seconds
    ///
    /// At most one sample is emitted per cycle, so `sample_period` should be
    /// longer than `cycle_period`.
    pub fn new(cycle_period: f64, sample_period: f64) -> Self {
        Resampler {
            cycle_period,
            sample_period,
            accumulated: 0.0,
        }
    }

    /// Account for one chip cycle
    /// Returns true if the current sample should be emitted
    pub fn clock(&mut self) -> bool {
        self.accumulated += self.cycle_period;
        if self.accumulated >= self.sample_period {
            self.accumulated -= self.sample_period;
            true
        } else {
            false
        }
    }
}
