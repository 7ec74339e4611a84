//! Talkbox processing engine
//!
//! Per sample, data flows strictly forward:
//!
//! 1. the carrier passes through the pre all-pass network
//! 2. the half-rate gate decides whether the overlap-add/LPC path runs
//! 3. on active samples both OLA channels exchange windowed samples and
//!    run analysis/synthesis when their frame fills; on skipped samples the
//!    previous synthesis sample is held
//! 4. the held synthesis sample passes through the post all-pass network
//! 5. wet and dry are mixed and written to both output channels
//!
//! All storage is fixed-capacity and owned by value. `process_block` never
//! allocates, locks, logs or fails.

use crate::dsp::allpass::AllpassNetwork;
use crate::dsp::lpc;
use crate::dsp::ola::{FrameState, HalfRateGate, HannWindow, OlaChannel, Phase};
use crate::dsp::params::{self, MixGains, TalkBoxParams};

/// LPC talkbox engine
///
/// Construction performs the first initialization, so the engine is always
/// ready to process.
///
/// # Example
/// ```
/// use talkbox_core::{TalkBoxParams, TalkBoxProcessor};
///
/// let mut engine = TalkBoxProcessor::new(48000.0, &TalkBoxParams::default());
/// let modulator = [0.0f32; 48];
/// let carrier = [0.0f32; 48];
/// let mut left = [0.0f32; 48];
/// let mut right = [0.0f32; 48];
/// engine.process_block(&modulator, &carrier, &mut left, &mut right);
/// assert!(left.iter().all(|&x| x == 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct TalkBoxProcessor {
    /// Clamped sample rate in Hz
    sample_rate: f32,
    /// Analysis frame length N
    frame_len: usize,
    /// Number of reflection coefficients
    order: usize,
    gains: MixGains,
    window: HannWindow,
    /// Two lanes, cursors offset by N/2
    channels: [OlaChannel; 2],
    gate: HalfRateGate,
    pre_filter: AllpassNetwork,
    post_filter: AllpassNetwork,
    /// Previous raw modulator sample seen on an active sample
    emphasis: f32,
    /// Synthesis sample held across skipped samples
    held: f32,
}

impl TalkBoxProcessor {
    /// Create an engine initialised for `sample_rate` and `params`
    pub fn new(sample_rate: f32, params: &TalkBoxParams) -> Self {
        let mut engine = Self {
            sample_rate: crate::MIN_SAMPLE_RATE,
            frame_len: 1,
            order: 0,
            gains: MixGains::default(),
            window: HannWindow::new(1),
            channels: [OlaChannel::new(0), OlaChannel::new(0)],
            gate: HalfRateGate::new(),
            pre_filter: AllpassNetwork::new(),
            post_filter: AllpassNetwork::new(),
            emphasis: 0.0,
            held: 0.0,
        };
        engine.init(sample_rate, params);
        engine
    }

    /// Full (re)initialization
    ///
    /// Clamps the sample rate, derives frame length, order and gains,
    /// rebuilds the window and clears every buffer, cursor and filter state.
    /// Calling this mid-stream produces an audible discontinuity.
    pub fn init(&mut self, sample_rate: f32, params: &TalkBoxParams) {
        self.sample_rate = params::clamp_sample_rate(sample_rate);
        self.frame_len = params::frame_length(self.sample_rate);
        self.window.rebuild(self.frame_len);

        let half = self.frame_len / 2;
        self.channels[0].reset(0);
        self.channels[1].reset(half);
        self.gate.reset();
        self.pre_filter.reset();
        self.post_filter.reset();
        self.emphasis = 0.0;
        self.held = 0.0;

        self.apply_params(params);

        tracing::debug!(
            sample_rate = self.sample_rate,
            frame_len = self.frame_len,
            order = self.order,
            wet_gain = self.gains.wet,
            dry_gain = self.gains.dry,
            "Talkbox initialised"
        );
    }

    /// Recompute LPC order and mix gains only
    ///
    /// Buffers, cursors, window and filter state are untouched, so this is
    /// safe to call between blocks while audio is running.
    pub fn update_parameters(&mut self, params: &TalkBoxParams) {
        self.apply_params(params);
        tracing::debug!(
            order = self.order,
            wet_gain = self.gains.wet,
            dry_gain = self.gains.dry,
            "Talkbox parameters updated"
        );
    }

    fn apply_params(&mut self, params: &TalkBoxParams) {
        self.order = params::lpc_order(self.sample_rate, params.quality);
        self.gains = MixGains::from_params(params);
    }

    /// Process one block
    ///
    /// `modulator` and `carrier` are mono inputs; `left` and `right` receive
    /// identical output. The shortest of the four slices sets the number of
    /// frames processed.
    pub fn process_block(
        &mut self,
        modulator: &[f32],
        carrier: &[f32],
        left: &mut [f32],
        right: &mut [f32],
    ) {
        let frames = modulator
            .len()
            .min(carrier.len())
            .min(left.len())
            .min(right.len());

        for n in 0..frames {
            let out = self.process_sample(modulator[n], carrier[n]);
            left[n] = out;
            right[n] = out;
        }

        self.pre_filter.flush_denormals();
        self.post_filter.flush_denormals();
    }

    #[inline]
    fn process_sample(&mut self, modulator: f32, carrier: f32) -> f32 {
        let carrier = self.pre_filter.process(carrier);

        if self.gate.tick() == Phase::Active {
            self.held = self.overlap_add(modulator, carrier);
        }

        let wet = self.post_filter.process(self.held);
        self.gains.wet * wet + self.gains.dry * modulator
    }

    /// Active-sample work: capture, exchange, advance, analyse full frames
    fn overlap_add(&mut self, modulator: f32, carrier: f32) -> f32 {
        for channel in self.channels.iter_mut() {
            channel.capture_carrier(carrier);
        }

        let emphasized = modulator - self.emphasis;
        self.emphasis = modulator;

        // lane 1 uses the complement of lane 0's window value
        let w = self.window.at(self.channels[0].cursor());
        let weights = [w, 1.0 - w];

        let mut sum = 0.0;
        for (channel, weight) in self.channels.iter_mut().zip(weights) {
            sum += channel.exchange(emphasized, weight);
            if channel.advance(self.frame_len) == FrameState::Full {
                let (frame, carrier_frame) = channel.frame_mut(self.frame_len);
                lpc::analyze_and_synthesize(frame, carrier_frame, self.order);
            }
        }
        sum
    }

    /// Clamped sample rate in Hz
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Analysis frame length N in samples
    pub fn frame_length(&self) -> usize {
        self.frame_len
    }

    /// Current LPC order
    pub fn lpc_order(&self) -> usize {
        self.order
    }

    /// Current mix gains
    pub fn gains(&self) -> MixGains {
        self.gains
    }

    /// Write cursors of the two OLA lanes
    pub fn cursors(&self) -> [usize; 2] {
        [self.channels[0].cursor(), self.channels[1].cursor()]
    }

    /// Gate phase of the next sample
    pub fn next_phase(&self) -> Phase {
        self.gate.peek()
    }

    /// Analysis window currently in use
    pub fn window(&self) -> &[f32] {
        self.window.as_slice()
    }

    /// Synthesis sample held for skipped samples
    pub fn held_sample(&self) -> f32 {
        self.held
    }

    /// Pre (carrier) and post (output) all-pass networks
    pub fn filters(&self) -> (&AllpassNetwork, &AllpassNetwork) {
        (&self.pre_filter, &self.post_filter)
    }

    /// Modulator/synthesis frame buffer of one lane (`lane` is 0 or 1)
    pub fn lane_buffer(&self, lane: usize) -> &[f32] {
        &self.channels[lane.min(1)].modulator()[..self.frame_len]
    }
}
