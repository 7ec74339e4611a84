//! LPC analysis and lattice synthesis
//!
//! A filled modulator frame (pre-emphasized and windowed) is analysed with
//! the autocorrelation method. The Levinson-Durbin recursion turns the
//! autocorrelation into reflection coefficients, which drive an all-pole
//! lattice filter excited by the matching carrier frame. The synthesized
//! frame overwrites the modulator frame in place.
//!
//! All scratch storage is fixed-size arrays of [`ORD_MAX`] on the stack.

use crate::ORD_MAX;

/// Bias applied to the zero-lag autocorrelation term
const STABILITY_BIAS: f32 = 1.001;

/// Frames with less (biased) energy than this are treated as silence
pub const SILENCE_THRESHOLD: f32 = 1.0e-5;

/// Residual energy below which the recursion stops
const RESIDUAL_FLOOR: f32 = 1.0e-20;

/// Largest reflection coefficient magnitude the lattice accepts
pub const MAX_REFLECTION: f32 = 0.995;

/// Result of analysing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Energy below the silence threshold, output frame zeroed
    Silent,
    /// Carrier frame filtered through the modulator envelope
    Synthesized,
}

/// Windowed autocorrelation for lags `0..=order`
///
/// The summation range shrinks with the lag. Lags that reach past the end
/// of `buf` produce zero.
pub fn autocorrelate(buf: &[f32], order: usize, r: &mut [f32; ORD_MAX]) {
    let order = order.min(ORD_MAX - 1);
    r.fill(0.0);
    for (lag, r_lag) in r.iter_mut().enumerate().take(order + 1) {
        if lag >= buf.len() {
            break;
        }
        *r_lag = buf[..buf.len() - lag]
            .iter()
            .zip(&buf[lag..])
            .map(|(a, b)| a * b)
            .sum();
    }
}

/// Levinson-Durbin recursion
///
/// Fills `k[1..=order]` with reflection coefficients and returns the gain
/// `sqrt(residual energy)`. If the residual underflows, the remaining
/// coefficients are zeroed and the gain is 0.
pub fn levinson_durbin(r: &[f32; ORD_MAX], order: usize, k: &mut [f32; ORD_MAX]) -> f32 {
    let order = order.min(ORD_MAX - 1);
    let mut a = [0.0f32; ORD_MAX];
    let mut at = [0.0f32; ORD_MAX];
    let mut e = r[0];

    k.fill(0.0);

    for i in 1..=order {
        let mut ki = -r[i];
        for j in 1..i {
            at[j] = a[j];
            ki -= a[j] * r[i - j];
        }

        if e.abs() < RESIDUAL_FLOOR {
            e = 0.0;
            k[i..=order].fill(0.0);
            break;
        }
        ki /= e;
        k[i] = ki;

        a[i] = ki;
        for j in 1..i {
            a[j] = at[j] + ki * at[i - j];
        }

        e *= 1.0 - ki * ki;
    }

    if e < RESIDUAL_FLOOR {
        e = 0.0;
    }
    e.sqrt()
}

/// Clamp `k[1..=order]` into `[-MAX_REFLECTION, MAX_REFLECTION]`
pub fn clamp_reflection(k: &mut [f32; ORD_MAX], order: usize) {
    let order = order.min(ORD_MAX - 1);
    for ki in k[..=order].iter_mut() {
        *ki = ki.clamp(-MAX_REFLECTION, MAX_REFLECTION);
    }
}

/// Run the all-pole lattice over `carrier`, writing into `out`
///
/// Each sample drives the lattice with `gain * carrier[i]`; the innermost
/// stage output is both the result and the next `z[0]`.
pub fn synthesize(out: &mut [f32], carrier: &[f32], k: &[f32; ORD_MAX], order: usize, gain: f32) {
    let order = order.min(ORD_MAX - 1);
    let mut z = [0.0f32; ORD_MAX];

    for (y, &c) in out.iter_mut().zip(carrier) {
        let mut x = gain * c;
        for j in (1..=order).rev() {
            x -= k[j] * z[j - 1];
            z[j] = z[j - 1] + k[j] * x;
        }
        z[0] = x;
        *y = x;
    }
}

/// Analyse `buf` and replace it with the carrier filtered through its envelope
///
/// `buf` and `carrier` are one analysis frame each. Silent frames are zeroed.
pub fn analyze_and_synthesize(buf: &mut [f32], carrier: &[f32], order: usize) -> FrameOutcome {
    let mut r = [0.0f32; ORD_MAX];
    let mut k = [0.0f32; ORD_MAX];

    autocorrelate(buf, order, &mut r);
    r[0] *= STABILITY_BIAS;

    if r[0].is_nan() || r[0] < SILENCE_THRESHOLD {
        buf.fill(0.0);
        return FrameOutcome::Silent;
    }

    let gain = levinson_durbin(&r, order, &mut k);
    clamp_reflection(&mut k, order);
    synthesize(buf, carrier, &k, order, gain);

    FrameOutcome::Synthesized
}
