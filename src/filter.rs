//! External Output Filter
//!
//! Fixed-point model of the passive RC network on the audio output: one
//! high-pass pole followed by one low-pass pole, evaluated once per chip
//! cycle.
//!
//! Coefficients are fitted into [`COEFF_BITS`]-bit multipliers with the
//! precision pushed into the shift amount, so the filter state needs
//! `32 - COEFF_BITS - 1` bits of headroom. Right shifts are arithmetic
//! (floor), which keeps output bit-exact against the reference arithmetic.

use std::f64::consts::PI;

/// Multiplier bit budget
pub const COEFF_BITS: u32 = 4;

/// Sample width fed into the filter
pub const SAMPLE_BITS: u32 = 24;

/// Left shift that aligns a 24-bit sample with the filter state
pub const INPUT_SHIFT: u32 = 32 - COEFF_BITS - 1 - SAMPLE_BITS;

/// Bits available for each filter state variable
pub const STATE_BITS: u32 = 32 - COEFF_BITS - 1;

/// Largest shift a fitted pole uses
pub const MAX_SHIFT: u32 = 31;

/// Multiply-shift pair for one pole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pole {
    /// Per-cycle multiplier, below `2^coeff_bits`
    pub mul: i32,
    /// Right shift applied after the multiply
    pub shift: u32,
}

impl Pole {
    /// Fit `1 - exp(-w0 * T)` into a `coeff_bits` multiplier
    ///
    /// `w0` is expected to be non-negative. A zero cutoff fits to a zero
    /// multiplier at [`MAX_SHIFT`], which freezes the pole.
    pub fn fit(w0: f64, period: f64, coeff_bits: u32) -> Self {
        let decay = 1.0 - (-w0 * period).exp();
        let max_mul = ((1u32 << coeff_bits) - 1) as f64;
        let shift = ((max_mul / decay).log2().floor().max(0.0) as u32).min(MAX_SHIFT);
        let mul = (decay * (1u64 << shift) as f64 + 0.5) as i32;
        Self { mul, shift }
    }
}

/// Coefficients of both poles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterCoefficients {
    pub hp: Pole,
    pub lp: Pole,
}

impl FilterCoefficients {
    /// Derive coefficients from angular cutoffs (rad/s) and the cycle period
    pub fn derive(w0_hp: f64, w0_lp: f64, period: f64, coeff_bits: u32) -> Self {
        Self {
            hp: Pole::fit(w0_hp, period, coeff_bits),
            lp: Pole::fit(w0_lp, period, coeff_bits),
        }
    }

    /// Derive coefficients from cutoffs in Hz with the default bit budget
    pub fn from_cutoffs_hz(hp_hz: u32, lp_hz: u32, period: f64) -> Self {
        Self::derive(
            2.0 * PI * f64::from(hp_hz),
            2.0 * PI * f64::from(lp_hz),
            period,
            COEFF_BITS,
        )
    }
}

/// Two-pole band-pass filter state
///
/// A bypassed filter passes samples through and never touches its state.
#[derive(Debug, Clone)]
pub struct ExternalFilter {
    coefficients: Option<FilterCoefficients>,
    v_hp: i32,
    v_lp: i32,
}

impl ExternalFilter {
    /// Active filter with zeroed state
    pub fn new(coefficients: FilterCoefficients) -> Self {
        Self {
            coefficients: Some(coefficients),
            v_hp: 0,
            v_lp: 0,
        }
    }

    /// Pass-through filter
    pub fn bypass() -> Self {
        Self {
            coefficients: None,
            v_hp: 0,
            v_lp: 0,
        }
    }

    pub fn is_bypass(&self) -> bool {
        self.coefficients.is_none()
    }

    pub fn coefficients(&self) -> Option<&FilterCoefficients> {
        self.coefficients.as_ref()
    }

    /// Current `(v_hp, v_lp)` state
    pub fn state(&self) -> (i32, i32) {
        (self.v_hp, self.v_lp)
    }

    /// Filter one cycle's sample
    ///
    /// The high-pass state is updated from the previous low-pass state
    /// before the low-pass state moves.
    #[inline]
    pub fn process(&mut self, sample: i32) -> i32 {
        let Some(c) = self.coefficients else {
            return sample;
        };

        let dv_hp = c.hp.mul.wrapping_mul(self.v_lp.wrapping_sub(self.v_hp)) >> c.hp.shift;
        self.v_hp = self.v_hp.wrapping_add(dv_hp);

        let aligned = sample.wrapping_shl(INPUT_SHIFT);
        let dv_lp = c.lp.mul.wrapping_mul(aligned.wrapping_sub(self.v_lp)) >> c.lp.shift;
        self.v_lp = self.v_lp.wrapping_add(dv_lp);

        self.v_lp.wrapping_sub(self.v_hp) >> INPUT_SHIFT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAL_PERIOD: f64 = 1.0 / 985_248.0;

    #[test]
    fn test_input_shift() {
        assert_eq!(INPUT_SHIFT, 3);
        assert_eq!(STATE_BITS, 27);
    }

    #[test]
    fn test_extreme_cutoffs_fit() {
        let c = FilterCoefficients::from_cutoffs_hz(1, 20_000, PAL_PERIOD);
        assert_eq!(c.hp, Pole { mul: 13, shift: 21 });
        assert_eq!(c.lp, Pole { mul: 8, shift: 6 });
        assert!(c.hp.mul < 16 && c.lp.mul < 16);
    }

    #[test]
    fn test_default_band_coefficients() {
        let c = FilterCoefficients::from_cutoffs_hz(10, 16_000, PAL_PERIOD);
        assert_eq!(c.hp, Pole { mul: 8, shift: 17 });
        assert_eq!(c.lp, Pole { mul: 12, shift: 7 });
    }

    #[test]
    fn test_shift_monotonic_in_cutoff() {
        let mut last_shift = u32::MAX;
        for hz in (1..=20_000).step_by(7) {
            let pole = Pole::fit(2.0 * PI * f64::from(hz), PAL_PERIOD, COEFF_BITS);
            assert!(pole.shift <= last_shift, "shift rose at {hz} Hz");
            assert!((0..16).contains(&pole.mul), "mul {} at {hz} Hz", pole.mul);
            last_shift = pole.shift;
        }
    }

    #[test]
    fn test_bypass_is_identity() {
        let mut filter = ExternalFilter::bypass();
        for x in [0, 1, -1, 8_388_607, -8_388_608, 12_345] {
            assert_eq!(filter.process(x), x);
        }
        assert_eq!(filter.state(), (0, 0));
        assert!(filter.is_bypass());
    }

    #[test]
    fn test_update_order() {
        let unit = Pole { mul: 1, shift: 1 };
        let mut filter = ExternalFilter::new(FilterCoefficients { hp: unit, lp: unit });
        let out: Vec<i32> = (0..3).map(|_| filter.process(16)).collect();
        assert_eq!(out, vec![8, 8, 6]);
        assert_eq!(filter.state(), (64, 112));
    }

    #[test]
    fn test_shifts_round_toward_negative_infinity() {
        let unit = Pole { mul: 1, shift: 1 };
        let mut filter = ExternalFilter::new(FilterCoefficients { hp: unit, lp: unit });
        assert_eq!(filter.process(-1), -1);
        assert_eq!(filter.state(), (0, -4));
    }

    #[test]
    fn test_state_bounded_under_full_scale_input() {
        let bound = 1i32 << STATE_BITS;
        for input in [(1 << 23) - 1, -(1 << 23)] {
            let mut filter = ExternalFilter::new(FilterCoefficients::from_cutoffs_hz(
                1,
                20_000,
                PAL_PERIOD,
            ));
            for _ in 0..10_000_000 {
                filter.process(input);
                let (v_hp, v_lp) = filter.state();
                assert!(v_hp.abs() < bound && v_lp.abs() < bound);
            }
        }
    }

    #[test]
    fn test_zero_cutoff_freezes_pole() {
        let pole = Pole::fit(0.0, PAL_PERIOD, COEFF_BITS);
        assert_eq!(pole, Pole { mul: 0, shift: MAX_SHIFT });

        let lp = Pole::fit(2.0 * PI * 16_000.0, PAL_PERIOD, COEFF_BITS);
        let mut filter = ExternalFilter::new(FilterCoefficients { hp: pole, lp });
        for _ in 0..1_000 {
            filter.process(1_000);
        }
        assert_eq!(filter.state().0, 0);
    }

    #[test]
    fn test_state_bounded_under_full_scale_swing() {
        let bound = 1i32 << STATE_BITS;
        for (hp_hz, lp_hz) in [(1, 20_000), (10, 16_000)] {
            let mut filter = ExternalFilter::new(FilterCoefficients::from_cutoffs_hz(
                hp_hz,
                lp_hz,
                PAL_PERIOD,
            ));
            let mut lowest = 0;
            for input in [(1 << 23) - 1, -(1 << 23)] {
                for _ in 0..1_000_000 {
                    lowest = lowest.min(filter.process(input));
                    let (v_hp, v_lp) = filter.state();
                    assert!(v_hp.abs() < bound && v_lp.abs() < bound);
                    assert!((i64::from(v_lp) - i64::from(v_hp)).abs() < 1 << 28);
                }
            }
            // Swing from the settled positive rail lands well below zero
            assert!(lowest < -(1 << 23), "{hp_hz}-{lp_hz} Hz: lowest {lowest}");
        }
    }

    #[test]
    fn test_dc_is_blocked() {
        let mut filter =
            ExternalFilter::new(FilterCoefficients::from_cutoffs_hz(10, 16_000, PAL_PERIOD));
        let mut out = 0;
        for _ in 0..2_000_000 {
            out = filter.process(100_000);
        }
        // The high-pass step stalls once mul * (v_lp - v_hp) drops below 2^shift
        assert!(out.abs() < 2_048, "residual DC {out}");
    }
}
