//! E2E tests for the wet/dry gain law
//!
//! Wet output scales with `0.5 * wet^2` and dry output with `2 * dry^2`.

use approx::assert_abs_diff_eq;
use talkbox::audio::wav::render;
use talkbox::TalkBoxParams;

const RATE: u32 = 48000;

fn voice() -> Vec<f32> {
    (0..RATE as usize / 2)
        .map(|i| {
            let t = i as f32 / RATE as f32;
            0.5 * (std::f32::consts::TAU * 440.0 * t).sin()
                + 0.2 * (std::f32::consts::TAU * 1320.0 * t).sin()
        })
        .collect()
}

fn saw() -> Vec<f32> {
    (0..RATE as usize / 2)
        .map(|i| ((i % 240) as f32 / 120.0) - 1.0)
        .collect()
}

fn rms(x: &[f32]) -> f32 {
    (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
}

/// Test wet output is the full-wet output scaled by the squared taper
#[test]
fn test_wet_follows_square_law() {
    let modulator = voice();
    let carrier = saw();

    let full = render(&modulator, &carrier, RATE, &TalkBoxParams::full_wet(), 48);
    assert!(rms(&full.left) > 0.0);

    for &wet in &[0.0f32, 0.25, 0.5, 0.75] {
        let params = TalkBoxParams {
            wet,
            dry: 0.0,
            quality: 1.0,
        };
        let out = render(&modulator, &carrier, RATE, &params, 48);
        // full_wet has gain 0.5, so the ratio is wet^2
        let ratio = wet * wet;
        for (a, b) in out.left.iter().zip(&full.left) {
            assert_abs_diff_eq!(*a, b * ratio, epsilon = 1e-5);
        }
    }
}

/// Test output level is monotonic in wet
#[test]
fn test_wet_monotonic() {
    let modulator = voice();
    let carrier = saw();

    let mut last = -1.0f32;
    for step in 0..=10 {
        let params = TalkBoxParams {
            wet: step as f32 / 10.0,
            dry: 0.0,
            quality: 1.0,
        };
        let level = rms(&render(&modulator, &carrier, RATE, &params, 48).left);
        assert!(level >= last, "wet step {} decreased level", step);
        last = level;
    }
}

/// Test dry-only output equals `2 * dry^2` times the modulator
#[test]
fn test_dry_follows_square_law() {
    let modulator = voice();
    let carrier = saw();

    for &dry in &[0.0f32, 0.3, 0.5, 1.0] {
        let params = TalkBoxParams {
            wet: 0.0,
            dry,
            quality: 1.0,
        };
        let out = render(&modulator, &carrier, RATE, &params, 48);
        let gain = 2.0 * dry * dry;
        for (y, x) in out.left.iter().zip(&modulator) {
            assert_abs_diff_eq!(*y, x * gain, epsilon = 1e-6);
        }
        assert_eq!(out.left, out.right);
    }
}

/// Test wet and dry paths superpose
#[test]
fn test_wet_and_dry_superpose() {
    let modulator = voice();
    let carrier = saw();

    let wet_only = TalkBoxParams {
        wet: 0.8,
        dry: 0.0,
        quality: 0.6,
    };
    let dry_only = TalkBoxParams {
        wet: 0.0,
        dry: 0.4,
        quality: 0.6,
    };
    let both = TalkBoxParams {
        wet: 0.8,
        dry: 0.4,
        quality: 0.6,
    };

    let a = render(&modulator, &carrier, RATE, &wet_only, 48);
    let b = render(&modulator, &carrier, RATE, &dry_only, 48);
    let c = render(&modulator, &carrier, RATE, &both, 48);
    for i in 0..c.len() {
        assert_abs_diff_eq!(c.left[i], a.left[i] + b.left[i], epsilon = 1e-5);
    }
}
