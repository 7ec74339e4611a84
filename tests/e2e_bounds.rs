//! E2E tests for derived constants across the operating range
//!
//! Frame length and LPC order must stay inside the fixed buffer bounds for
//! every sample rate and quality, including out-of-range requests.

use talkbox::dsp::params::{frame_length, lpc_order};
use talkbox::{TalkBoxParams, TalkBoxProcessor, BUF_MAX, ORD_MAX};

/// Test frame length and order bounds over the valid range
#[test]
fn test_bounds_valid_range() {
    let mut rate = 8000.0f32;
    while rate <= 96000.0 {
        let n = frame_length(rate);
        assert!((1..=BUF_MAX).contains(&n), "rate {} gave N = {}", rate, n);

        for step in 0..=20 {
            let quality = step as f32 / 20.0;
            let order = lpc_order(rate, quality);
            assert!(
                order < ORD_MAX,
                "rate {} quality {} gave order {}",
                rate,
                quality,
                order
            );
        }
        rate += 500.0;
    }
}

/// Test extreme requests are clamped, not rejected
#[test]
fn test_bounds_out_of_range_requests() {
    let rates = [0.0f32, -48000.0, 1.0, 7999.0, 96001.0, 1.0e9, f32::INFINITY, f32::NAN];
    let qualities = [-1.0f32, 0.0, 1.0, 2.0, 100.0, f32::NAN];

    for &rate in &rates {
        for &quality in &qualities {
            let params = TalkBoxParams {
                wet: 1.0,
                dry: 0.0,
                quality,
            };
            let engine = TalkBoxProcessor::new(rate, &params);
            let sr = engine.sample_rate();
            assert!((8000.0..=96000.0).contains(&sr), "rate {} clamped to {}", rate, sr);
            assert!(engine.frame_length() >= 1 && engine.frame_length() <= BUF_MAX);
            assert!(engine.lpc_order() < ORD_MAX);
            assert_eq!(engine.window().len(), engine.frame_length());
        }
    }
}

/// Test the engine's constants at common rates
#[test]
fn test_constants_at_common_rates() {
    let cases = [(8000.0f32, 130usize), (44100.0, 720), (48000.0, 783), (96000.0, 1567)];
    for &(rate, n) in &cases {
        let engine = TalkBoxProcessor::new(rate, &TalkBoxParams::full_wet());
        assert_eq!(engine.frame_length(), n, "frame length at {}", rate);
        assert_eq!(engine.cursors(), [0, n / 2]);
    }
}

/// Test cursors stay inside the frame while processing
#[test]
fn test_cursors_stay_in_frame() {
    let mut engine = TalkBoxProcessor::new(8000.0, &TalkBoxParams::full_wet());
    let n = engine.frame_length();
    let input: Vec<f32> = (0..37).map(|i| (i as f32 * 0.3).sin()).collect();
    let mut left = vec![0.0f32; 37];
    let mut right = vec![0.0f32; 37];

    for _ in 0..200 {
        engine.process_block(&input, &input, &mut left, &mut right);
        let [a, b] = engine.cursors();
        assert!(a < n && b < n);
        // the two lanes stay half a frame apart
        assert_eq!((b + n - a) % n, n / 2);
    }
}
