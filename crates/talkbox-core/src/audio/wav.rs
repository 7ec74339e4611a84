//! Offline render harness
//!
//! Decodes a modulator and a carrier WAV, drives the engine over them in
//! fixed-size blocks exactly like an audio callback would, and writes the
//! two output channels as an interleaved 32-bit float stereo WAV.

use crate::audio::analysis::SignalSummary;
use crate::dsp::params::TalkBoxParams;
use crate::dsp::processor::TalkBoxProcessor;
use crate::MAX_BLOCK_SIZE;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the WAV harness
#[derive(Error, Debug)]
pub enum WavError {
    #[error("Failed to open WAV {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to create WAV {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("WAV file has 0 channels: {}", .0.display())]
    NoChannels(PathBuf),

    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    #[error("Sample rates must match: modulator {modulator} Hz, carrier {carrier} Hz")]
    SampleRateMismatch { modulator: u32, carrier: u32 },

    #[error("WAV codec error: {0}")]
    Codec(#[from] hound::Error),
}

/// Mono signal decoded from a WAV file
#[derive(Debug, Clone)]
pub struct MonoWav {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source file
    pub channels: u16,
}

/// Engine output, one vector per channel
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBuffer {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Offline render request
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub modulator: PathBuf,
    pub carrier: PathBuf,
    pub output: PathBuf,
    pub block_size: usize,
    pub params: TalkBoxParams,
}

impl Default for RenderJob {
    fn default() -> Self {
        Self {
            modulator: PathBuf::from("mod.wav"),
            carrier: PathBuf::from("car.wav"),
            output: PathBuf::from("out.wav"),
            block_size: crate::DEFAULT_BLOCK_SIZE,
            params: TalkBoxParams::full_wet(),
        }
    }
}

/// Outcome of an offline render
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub sample_rate: u32,
    pub frames: usize,
    pub block_size: usize,
    pub summary: SignalSummary,
}

/// Read a WAV file and keep its first channel as f32 in [-1.0, 1.0]
///
/// Supports 8/16/24/32-bit integer and 32-bit float formats.
pub fn read_mono(path: &Path) -> Result<MonoWav, WavError> {
    let reader = WavReader::open(path).map_err(|source| WavError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(WavError::NoChannels(path.to_path_buf()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if !matches!(bits, 8 | 16 | 24 | 32) {
                return Err(WavError::UnsupportedBitDepth(bits));
            }
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<f32>, _>>()?
        }
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<f32>, _>>()?,
    };

    let samples: Vec<f32> = interleaved.iter().step_by(channels).copied().collect();

    tracing::info!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        frames = samples.len(),
        "Decoded WAV"
    );

    Ok(MonoWav {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Write two channels as an interleaved 32-bit float stereo WAV
pub fn write_stereo_f32(path: &Path, output: &StereoBuffer, sample_rate: u32) -> Result<(), WavError> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).map_err(|source| WavError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    for (&l, &r) in output.left.iter().zip(&output.right) {
        writer.write_sample(l)?;
        writer.write_sample(r)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Drive a fresh engine over `modulator`/`carrier` in blocks of `block_size`
///
/// The longer input is truncated to the shorter. The last block may be
/// short. `block_size` is clamped to `1..=MAX_BLOCK_SIZE`.
pub fn render(
    modulator: &[f32],
    carrier: &[f32],
    sample_rate: u32,
    params: &TalkBoxParams,
    block_size: usize,
) -> StereoBuffer {
    let frames = modulator.len().min(carrier.len());
    let block_size = block_size.clamp(1, MAX_BLOCK_SIZE);

    let mut engine = TalkBoxProcessor::new(sample_rate as f32, params);
    let mut output = StereoBuffer {
        left: vec![0.0; frames],
        right: vec![0.0; frames],
    };

    let blocks = modulator[..frames]
        .chunks(block_size)
        .zip(carrier[..frames].chunks(block_size))
        .zip(output.left.chunks_mut(block_size))
        .zip(output.right.chunks_mut(block_size));

    for (((m, c), l), r) in blocks {
        engine.process_block(m, c, l, r);
    }

    output
}

/// Full offline pipeline: decode, check, render, encode
pub fn render_files(job: &RenderJob) -> Result<RenderReport, WavError> {
    let modulator = read_mono(&job.modulator)?;
    let carrier = read_mono(&job.carrier)?;

    if modulator.sample_rate != carrier.sample_rate {
        return Err(WavError::SampleRateMismatch {
            modulator: modulator.sample_rate,
            carrier: carrier.sample_rate,
        });
    }
    let sample_rate = modulator.sample_rate;

    if modulator.samples.len() != carrier.samples.len() {
        tracing::warn!(
            modulator_frames = modulator.samples.len(),
            carrier_frames = carrier.samples.len(),
            "Input lengths differ, truncating to the shorter"
        );
    }

    let block_size = job.block_size.clamp(1, MAX_BLOCK_SIZE);
    let output = render(
        &modulator.samples,
        &carrier.samples,
        sample_rate,
        &job.params,
        block_size,
    );
    write_stereo_f32(&job.output, &output, sample_rate)?;

    let summary = SignalSummary::analyze(&output.left, sample_rate);
    tracing::info!(
        output = %job.output.display(),
        frames = output.len(),
        peak = summary.peak,
        rms = summary.rms,
        "Render complete"
    );

    Ok(RenderReport {
        sample_rate,
        frames: output.len(),
        block_size,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_read_mono_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_test_wav(&path, 44100, 2, &[16384, -16384, 8192, 0]);

        let wav = read_mono(&path).unwrap();
        assert_eq!(wav.sample_rate, 44100);
        assert_eq!(wav.channels, 2);
        assert_eq!(wav.samples, vec![0.5, 0.25]);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_mono(Path::new("/nonexistent/definitely_missing.wav")).unwrap_err();
        assert!(matches!(err, WavError::Open { .. }));
    }

    #[test]
    fn test_render_truncates_to_shorter_input() {
        let modulator = vec![0.0f32; 100];
        let carrier = vec![0.0f32; 70];
        let out = render(&modulator, &carrier, 48000, &TalkBoxParams::default(), 48);
        assert_eq!(out.len(), 70);
        assert_eq!(out.right.len(), 70);
    }

    #[test]
    fn test_render_block_size_independent() {
        let modulator: Vec<f32> = (0..3000).map(|i| (i as f32 * 0.07).sin() * 0.5).collect();
        let carrier: Vec<f32> = (0..3000).map(|i| ((i % 160) as f32 / 80.0) - 1.0).collect();
        let params = TalkBoxParams::full_wet();

        let a = render(&modulator, &carrier, 48000, &params, 48);
        let b = render(&modulator, &carrier, 48000, &params, 37);
        // only the per-block denormal flush depends on block boundaries
        for (x, y) in a.left.iter().zip(&b.left) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_write_stereo_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let buffer = StereoBuffer {
            left: vec![0.1, 0.2],
            right: vec![-0.1, -0.2],
        };
        write_stereo_f32(&path, &buffer, 48000).unwrap();

        let reader = WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.1, -0.1, 0.2, -0.2]);
    }
}
