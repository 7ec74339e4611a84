//! Overlap-add buffering and half-rate scheduling
//!
//! Two [`OlaChannel`]s run 50% out of phase. On every active sample each
//! channel hands back the windowed synthesis sample stored at its cursor
//! (fading out) and takes the windowed, pre-emphasized modulator sample in
//! its place (fading in). When a cursor wraps, the channel holds a full
//! analysis frame and is ready for LPC. The [`HalfRateGate`] decides which
//! samples are active.

use crate::BUF_MAX;

/// Phase of the half-rate gate for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Heavy path skipped, held synthesis sample reused
    Skip,
    /// Heavy path runs
    Active,
}

impl Phase {
    fn flip(self) -> Self {
        match self {
            Phase::Skip => Phase::Active,
            Phase::Active => Phase::Skip,
        }
    }
}

/// Toggle that activates the analysis/synthesis path on every second sample
///
/// The first sample after a reset is a [`Phase::Skip`] sample.
#[derive(Debug, Clone)]
pub struct HalfRateGate {
    next: Phase,
}

impl HalfRateGate {
    pub fn new() -> Self {
        Self { next: Phase::Skip }
    }

    /// Phase of the current sample; advances the gate
    #[inline]
    pub fn tick(&mut self) -> Phase {
        let phase = self.next;
        self.next = phase.flip();
        phase
    }

    /// Phase the next call to [`tick`](Self::tick) will return
    pub fn peek(&self) -> Phase {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = Phase::Skip;
    }
}

impl Default for HalfRateGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic Hann window `w[i] = 0.5 - 0.5*cos(2*pi*i/N)`
#[derive(Debug, Clone)]
pub struct HannWindow {
    table: [f32; BUF_MAX],
    len: usize,
}

impl HannWindow {
    /// Build a window of `len` samples (clamped to `1..=BUF_MAX`)
    pub fn new(len: usize) -> Self {
        let mut window = Self {
            table: [0.0; BUF_MAX],
            len: 1,
        };
        window.rebuild(len);
        window
    }

    /// Recompute the table for a new length
    pub fn rebuild(&mut self, len: usize) {
        let len = len.clamp(1, BUF_MAX);
        let step = std::f32::consts::TAU / len as f32;
        self.table[..len]
            .iter_mut()
            .enumerate()
            .for_each(|(i, w)| *w = 0.5 - 0.5 * (step * i as f32).cos());
        self.table[len..].fill(0.0);
        self.len = len;
    }

    #[inline]
    pub fn at(&self, index: usize) -> f32 {
        self.table[index]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.table[..self.len]
    }
}

/// Cursor state after an advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Frame still being filled
    Filling,
    /// Cursor wrapped: the frame is complete and ready for analysis
    Full,
}

/// One overlap-add lane: modulator frame, carrier frame and write cursor
#[derive(Debug, Clone)]
pub struct OlaChannel {
    modulator: [f32; BUF_MAX],
    carrier: [f32; BUF_MAX],
    cursor: usize,
}

impl OlaChannel {
    /// Empty channel with its cursor at `cursor`
    pub fn new(cursor: usize) -> Self {
        Self {
            modulator: [0.0; BUF_MAX],
            carrier: [0.0; BUF_MAX],
            cursor: cursor.min(BUF_MAX - 1),
        }
    }

    /// Zero both frames and move the cursor
    pub fn reset(&mut self, cursor: usize) {
        self.modulator.fill(0.0);
        self.carrier.fill(0.0);
        self.cursor = cursor.min(BUF_MAX - 1);
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Store a conditioned carrier sample at the cursor
    #[inline]
    pub fn capture_carrier(&mut self, sample: f32) {
        self.carrier[self.cursor] = sample;
    }

    /// Swap the stored sample at the cursor for a new windowed one
    ///
    /// Returns the previous content scaled by `weight` (fading out) and
    /// stores `input * weight` (fading in).
    #[inline]
    pub fn exchange(&mut self, input: f32, weight: f32) -> f32 {
        let slot = &mut self.modulator[self.cursor];
        let faded_out = *slot * weight;
        *slot = input * weight;
        faded_out
    }

    /// Move the cursor forward within a frame of `frame_len` samples
    ///
    /// On [`FrameState::Full`] the cursor is already back at 0.
    #[inline]
    pub fn advance(&mut self, frame_len: usize) -> FrameState {
        self.cursor += 1;
        if self.cursor >= frame_len {
            self.cursor = 0;
            FrameState::Full
        } else {
            FrameState::Filling
        }
    }

    /// The filled modulator frame (mutable, for in-place synthesis) and the
    /// matching carrier frame
    pub fn frame_mut(&mut self, frame_len: usize) -> (&mut [f32], &[f32]) {
        let len = frame_len.min(BUF_MAX);
        (&mut self.modulator[..len], &self.carrier[..len])
    }

    pub fn modulator(&self) -> &[f32] {
        &self.modulator
    }

    pub fn carrier(&self) -> &[f32] {
        &self.carrier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gate_alternates_starting_with_skip() {
        let mut gate = HalfRateGate::new();
        assert_eq!(gate.tick(), Phase::Skip);
        assert_eq!(gate.tick(), Phase::Active);
        assert_eq!(gate.tick(), Phase::Skip);
        assert_eq!(gate.tick(), Phase::Active);
    }

    #[test]
    fn test_gate_reset() {
        let mut gate = HalfRateGate::new();
        gate.tick();
        assert_eq!(gate.peek(), Phase::Active);
        gate.reset();
        assert_eq!(gate.peek(), Phase::Skip);
    }

    #[test]
    fn test_hann_window_shape() {
        let window = HannWindow::new(8);
        assert_eq!(window.len(), 8);
        assert_abs_diff_eq!(window.at(0), 0.0);
        assert_abs_diff_eq!(window.at(4), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(window.at(2), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(window.at(2), window.at(6), epsilon = 1e-6);
    }

    #[test]
    fn test_hann_halves_are_complementary() {
        let n = 784;
        let window = HannWindow::new(n);
        for i in 0..n / 2 {
            assert_abs_diff_eq!(window.at(i) + window.at(i + n / 2), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_window_rebuild_clears_tail() {
        let mut window = HannWindow::new(100);
        window.rebuild(10);
        assert_eq!(window.len(), 10);
        assert_eq!(window.as_slice().len(), 10);
        assert_eq!(window.at(50), 0.0);
    }

    #[test]
    fn test_window_length_clamped() {
        assert_eq!(HannWindow::new(0).len(), 1);
        assert_eq!(HannWindow::new(BUF_MAX * 2).len(), BUF_MAX);
    }

    #[test]
    fn test_channel_exchange_fades() {
        let mut channel = OlaChannel::new(0);
        assert_eq!(channel.exchange(1.0, 0.5), 0.0);
        assert_eq!(channel.modulator()[0], 0.5);
        // same slot again: old content faded out by the new weight
        assert_eq!(channel.exchange(0.0, 0.5), 0.25);
    }

    #[test]
    fn test_channel_wraps_at_frame_length() {
        let mut channel = OlaChannel::new(2);
        assert_eq!(channel.advance(4), FrameState::Filling);
        assert_eq!(channel.cursor(), 3);
        assert_eq!(channel.advance(4), FrameState::Full);
        assert_eq!(channel.cursor(), 0);
    }

    #[test]
    fn test_channel_capture_and_frame() {
        let mut channel = OlaChannel::new(1);
        channel.capture_carrier(0.75);
        let (modulator, carrier) = channel.frame_mut(3);
        assert_eq!(modulator.len(), 3);
        assert_eq!(carrier, &[0.0, 0.75, 0.0]);
    }

    #[test]
    fn test_channel_reset() {
        let mut channel = OlaChannel::new(0);
        channel.capture_carrier(1.0);
        channel.exchange(1.0, 1.0);
        channel.advance(10);
        channel.reset(5);
        assert_eq!(channel.cursor(), 5);
        assert!(channel.modulator().iter().all(|&x| x == 0.0));
        assert!(channel.carrier().iter().all(|&x| x == 0.0));
    }
}
