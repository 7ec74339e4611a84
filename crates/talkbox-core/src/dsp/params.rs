//! Engine parameters and the constants derived from them
//!
//! All derivations clamp instead of failing: out-of-range inputs are pulled
//! back into the ranges the fixed-size buffers can hold.

use crate::{BUF_MAX, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, ORD_MAX};
use serde::{Deserialize, Serialize};

/// Analysis frame length as a fraction of the sample rate (~784 samples at 48kHz)
const FRAME_SECONDS: f32 = 0.01633;

/// LPC order per Hz of sample rate at quality 0
const ORDER_BASE: f32 = 0.0001;

/// Additional LPC order per Hz of sample rate at quality 1
const ORDER_QUALITY: f32 = 0.0004;

fn default_wet() -> f32 {
    0.5
}

fn default_dry() -> f32 {
    0.0
}

fn default_quality() -> f32 {
    1.0
}

/// User-facing parameter set, each value nominally in [0, 1]
///
/// Values outside the nominal range are not rejected; they flow through the
/// gain and order formulas and are bounded there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TalkBoxParams {
    /// Vocoded signal level
    #[serde(default = "default_wet")]
    pub wet: f32,
    /// Dry modulator level
    #[serde(default = "default_dry")]
    pub dry: f32,
    /// LPC resolution (higher means more reflection coefficients)
    #[serde(default = "default_quality")]
    pub quality: f32,
}

impl Default for TalkBoxParams {
    fn default() -> Self {
        Self {
            wet: default_wet(),
            dry: default_dry(),
            quality: default_quality(),
        }
    }
}

impl TalkBoxParams {
    /// Full effect, no dry voice, maximum resolution
    pub fn full_wet() -> Self {
        Self {
            wet: 1.0,
            dry: 0.0,
            quality: 1.0,
        }
    }
}

/// Output mix gains with the non-linear taper applied
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MixGains {
    pub wet: f32,
    pub dry: f32,
}

impl MixGains {
    /// `wet = 0.5 * wet^2`, `dry = 2 * dry^2`
    pub fn from_params(params: &TalkBoxParams) -> Self {
        Self {
            wet: 0.5 * params.wet * params.wet,
            dry: 2.0 * params.dry * params.dry,
        }
    }
}

/// Clamp a sample rate into the supported range
///
/// NaN maps to the lowest supported rate.
pub fn clamp_sample_rate(sample_rate: f32) -> f32 {
    if sample_rate.is_nan() {
        return MIN_SAMPLE_RATE;
    }
    sample_rate.clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE)
}

/// Analysis window length in samples for a (clamped) sample rate
///
/// Always within `1..=BUF_MAX`.
pub fn frame_length(sample_rate: f32) -> usize {
    let n = (FRAME_SECONDS * sample_rate).floor();
    // float-to-int casts saturate, so negative or NaN values land on 0
    (n as usize).clamp(1, BUF_MAX)
}

/// Number of reflection coefficients for a (clamped) sample rate and quality
///
/// Always within `0..ORD_MAX`.
pub fn lpc_order(sample_rate: f32, quality: f32) -> usize {
    let order = ((ORDER_BASE + ORDER_QUALITY * quality) * sample_rate).floor();
    (order as usize).min(ORD_MAX - 1)
}
