//! Fixed two-section all-pass network
//!
//! The same network runs twice per sample with independent state: once on
//! the raw carrier before analysis (phase smearing, less "buzz") and once on
//! the overlap-added synthesis output before mixing.
//!
//! Each section is a first-order all-pass `p = a + h*x; a = b; b = x - h*p`.
//! The second section is fed from the one-sample input snapshot, so the
//! network keeps five taps of state.

/// Coefficient of the first section
pub const H0: f32 = 0.3;

/// Coefficient of the second section
pub const H1: f32 = 0.77;

/// Magnitude below which decaying taps are flushed to zero
pub const DENORMAL_THRESHOLD: f32 = 1.0e-10;

/// Two-section all-pass network with five taps of state
#[derive(Debug, Clone, Default)]
pub struct AllpassNetwork {
    /// Taps 0..=3 are the delay chains of the two sections, tap 4 holds the
    /// previous raw input sample
    taps: [f32; 5],
}

impl AllpassNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one sample
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let t = &mut self.taps;

        let p = t[0] + H0 * x;
        t[0] = t[1];
        t[1] = x - H0 * p;

        let q = t[2] + H1 * t[4];
        t[2] = t[3];
        t[3] = t[4] - H1 * q;

        t[4] = x;
        p + q
    }

    /// Force near-zero decaying state to exactly zero
    ///
    /// Only taps 0..=3 are flushed. Tap 4 is a raw input snapshot and is
    /// left as is.
    pub fn flush_denormals(&mut self) {
        for tap in self.taps[..4].iter_mut() {
            if tap.abs() < DENORMAL_THRESHOLD {
                *tap = 0.0;
            }
        }
    }

    /// Clear all state
    pub fn reset(&mut self) {
        self.taps = [0.0; 5];
    }

    /// Current tap values
    pub fn taps(&self) -> &[f32; 5] {
        &self.taps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_in_zero_out() {
        let mut ap = AllpassNetwork::new();
        for _ in 0..100 {
            assert_eq!(ap.process(0.0), 0.0);
        }
    }

    #[test]
    fn test_impulse_response_head() {
        let mut ap = AllpassNetwork::new();
        // p = 0.3, q = 0 (second section still sees the old snapshot)
        assert_relative_eq!(ap.process(1.0), 0.3);
        // first section is silent for one more sample, second sees the snapshot
        assert_relative_eq!(ap.process(0.0), 0.77, epsilon = 1e-6);
        // 0.91 reaches the first section's output two samples after the impulse
        assert_relative_eq!(ap.process(0.0), 0.91, epsilon = 1e-6);
        assert_relative_eq!(ap.process(0.0), 1.0 - 0.77 * 0.77, epsilon = 1e-6);
    }

    #[test]
    fn test_flush_leaves_input_snapshot() {
        let mut ap = AllpassNetwork::new();
        ap.process(1.0e-12);
        ap.flush_denormals();
        let taps = ap.taps();
        assert_eq!(taps[0], 0.0);
        assert_eq!(taps[1], 0.0);
        assert_eq!(taps[2], 0.0);
        assert_eq!(taps[3], 0.0);
        assert_eq!(taps[4], 1.0e-12);
    }

    #[test]
    fn test_flush_keeps_audible_state() {
        let mut ap = AllpassNetwork::new();
        ap.process(0.5);
        let before = *ap.taps();
        ap.flush_denormals();
        assert_eq!(*ap.taps(), before);
    }

    #[test]
    fn test_decays_after_impulse() {
        let mut ap = AllpassNetwork::new();
        ap.process(1.0);
        let mut last = 0.0f32;
        for _ in 0..2000 {
            last = ap.process(0.0);
        }
        assert!(last.abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut ap = AllpassNetwork::new();
        ap.process(0.7);
        ap.reset();
        assert_eq!(*ap.taps(), [0.0; 5]);
    }
}
