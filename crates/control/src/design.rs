//! Filter coefficient design.
//!
//! FIR tables are windowed sinc with a modified Blackman window; only the
//! first half (plus the center tap for odd orders) is computed and then
//! mirrored. Notch sections are a two-stage lattice.

use core::f32::consts::PI;

use libm::{cosf, sinf};
use params::Function;
use platform::{FirScale, NotchCoefficients};

/// Longest FIR table the engine accepts.
pub const MAX_TAPS: usize = 256;

const HALF_TAPS: usize = MAX_TAPS / 2;

/// Window coefficients of the modified Blackman window.
const WINDOW: [f32; 3] = [0.482_164_33, 0.485_502_5, 0.032_333_15];

/// Center tap above which the table is quantised as Q15 rather than Q16.
const Q15_THRESHOLD: f32 = 0.4999;

/// Windowed-sinc designer. The window of the last order is cached.
pub struct FirDesigner {
    window: [f32; HALF_TAPS],
    order: usize,
}

impl FirDesigner {
    /// Designer with no window computed yet.
    pub const fn new() -> Self {
        Self {
            window: [0.0; HALF_TAPS],
            order: 0,
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: order is in 3..=MAX_TAPS
    #[allow(clippy::cast_precision_loss)] // indices < 256 are exact in f32
    fn prepare_window(&mut self, order: usize) {
        if order == self.order {
            return;
        }
        let span = (order - 1) as f32;
        let half = (order - 1) / 2;
        for (i, w) in self.window.iter_mut().enumerate().take(half + 1) {
            let x = 2.0 * PI * i as f32 / span;
            *w = WINDOW[0] - WINDOW[1] * cosf(x) + WINDOW[2] * cosf(2.0 * x);
        }
        self.order = order;
    }

    /// Design an `order`-tap table for `function` into `out`.
    ///
    /// `f1` is the cutoff (LP/HP) or lower edge, `f2` the upper edge (BP/BS
    /// only). Returns `None` for functions that are not windowed-sinc, or
    /// when `order` is outside `3..=MAX_TAPS` or longer than `out`.
    #[allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)] // Safety: order is in 3..=MAX_TAPS and ≤ out.len(), so every index below is < order
    #[allow(clippy::cast_precision_loss)] // indices < 256 are exact in f32
    #[allow(clippy::cast_possible_truncation)] // quantised taps are clamped to i16 first
    pub fn design(
        &mut self,
        function: Function,
        f1: f32,
        f2: f32,
        order: usize,
        sample_rate: f32,
        out: &mut [i16],
    ) -> Option<FirScale> {
        if !matches!(
            function,
            Function::LowPass | Function::HighPass | Function::BandPass | Function::BandStop
        ) || !(3..=MAX_TAPS).contains(&order)
            || out.len() < order
        {
            return None;
        }
        self.prepare_window(order);

        let d = 2.0 / sample_rate;
        let w1 = d * f1;
        let w2 = d * f2;
        let mid = (order - 1) / 2;
        let mut half = [0.0f32; HALF_TAPS];

        for i in 0..order / 2 {
            let t = PI * (i as f32 - (order - 1) as f32 / 2.0);
            let h = match function {
                Function::LowPass => sinf(w1 * t),
                Function::HighPass => sinf(t) - sinf(w1 * t),
                Function::BandPass => sinf(w2 * t) - sinf(w1 * t),
                _ => sinf(t) + sinf(w1 * t) - sinf(w2 * t),
            };
            half[i] = self.window[i] * h / t;
        }
        if order % 2 == 1 {
            let h = match function {
                Function::LowPass => w1,
                Function::HighPass => 1.0 - w1,
                Function::BandPass => w2 - w1,
                _ => 1.0 + w1 - w2,
            };
            half[mid] = self.window[mid] * h;
        }

        let (scale, factor) = if half[mid] > Q15_THRESHOLD {
            (FirScale::Q15, 32_768.0)
        } else {
            (FirScale::Q16, 65_536.0)
        };
        for i in 0..=mid {
            let q = (factor * half[i] + 0.5) as i32;
            let tap = q.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
            out[i] = tap;
            out[order - 1 - i] = tap;
        }
        Some(scale)
    }
}

impl Default for FirDesigner {
    fn default() -> Self {
        Self::new()
    }
}

/// Lattice coefficients for a notch (or inverse notch) at `fnotch` with
/// bandwidth `fwidth`. Returns `None` for other functions.
pub fn notch(
    function: Function,
    fnotch: f32,
    fwidth: f32,
    sample_rate: f32,
) -> Option<NotchCoefficients> {
    let (g1, g2) = match function {
        Function::Notch => (0.5, 0.0),
        Function::InvNotch => (0.0, 0.5),
        _ => return None,
    };
    let t = PI * fwidth / sample_rate;
    let (c, s) = (cosf(t), sinf(t));
    Some(NotchCoefficients {
        k1: -cosf(2.0 * PI * fnotch / sample_rate),
        k2: (c - s) / (c + s),
        g1,
        g2,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn low_pass_is_symmetric_and_q16() {
        let mut d = FirDesigner::new();
        let mut taps = [0i16; MAX_TAPS];
        let scale = d
            .design(Function::LowPass, 1_000.0, 0.0, 127, 48_000.0, &mut taps)
            .unwrap();
        assert_eq!(scale, FirScale::Q16);
        for i in 0..127 {
            assert_eq!(taps[i], taps[126 - i]);
        }
        // Center tap ≈ w(mid)·2·fc/fs ≈ 0.0417 → Q16 ≈ 2731.
        assert!((2_600..2_800).contains(&taps[63]), "{}", taps[63]);
        assert!(taps[0].abs() < 5);
    }

    #[test]
    fn high_pass_center_is_q15() {
        let mut d = FirDesigner::new();
        let mut taps = [0i16; MAX_TAPS];
        let scale = d
            .design(Function::HighPass, 1_000.0, 0.0, 127, 48_000.0, &mut taps)
            .unwrap();
        assert_eq!(scale, FirScale::Q15);
        assert!(taps[63] > 30_000);
    }

    #[test]
    fn even_order_has_no_center() {
        let mut d = FirDesigner::new();
        let mut taps = [0i16; MAX_TAPS];
        d.design(Function::BandPass, 1_000.0, 2_000.0, 128, 48_000.0, &mut taps)
            .unwrap();
        assert_eq!(taps[63], taps[64]);
        assert_eq!(taps[0], taps[127]);
    }

    #[test]
    fn rejects_non_fir_functions_and_bad_orders() {
        let mut d = FirDesigner::new();
        let mut taps = [0i16; MAX_TAPS];
        assert!(d
            .design(Function::Notch, 1.0, 2.0, 31, 48_000.0, &mut taps)
            .is_none());
        assert!(d
            .design(Function::LowPass, 1.0, 2.0, 2, 48_000.0, &mut taps)
            .is_none());
        assert!(d
            .design(Function::LowPass, 1.0, 2.0, 300, 48_000.0, &mut taps)
            .is_none());
    }

    #[test]
    fn notch_mixes() {
        let n = notch(Function::Notch, 12_000.0, 1_000.0, 48_000.0).unwrap();
        assert!(n.k1.abs() < 1e-6);
        assert_eq!((n.g1, n.g2), (0.5, 0.0));
        assert!(n.k2 > 0.0 && n.k2 < 1.0);
        let p = notch(Function::InvNotch, 12_000.0, 1_000.0, 48_000.0).unwrap();
        assert_eq!((p.g1, p.g2), (0.0, 0.5));
        assert!(notch(Function::LowPass, 1.0, 1.0, 48_000.0).is_none());
    }
}
