//! Level and spectrum summaries of rendered audio
//!
//! Used to report on offline renders and to check that the vocoded output
//! follows the modulator's spectral envelope.

use rustfft::{num_complex::Complex, FftPlanner};

/// Summary of a mono signal
#[derive(Debug, Clone, Default)]
pub struct SignalSummary {
    /// Number of samples analysed
    pub frames: usize,
    /// Largest absolute sample value
    pub peak: f32,
    /// Root-mean-square level
    pub rms: f32,
    /// Whether every sample is finite
    pub is_finite: bool,
    /// Frequency of the strongest FFT bin in Hz (0 for silence)
    pub dominant_hz: f32,
}

impl SignalSummary {
    /// Analyse `samples` recorded at `sample_rate`
    pub fn analyze(samples: &[f32], sample_rate: u32) -> Self {
        if samples.is_empty() {
            return Self {
                is_finite: true,
                ..Default::default()
            };
        }

        let is_finite = samples.iter().all(|x| x.is_finite());
        let peak = samples.iter().map(|x| x.abs()).fold(0.0f32, f32::max);
        let energy: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
        let rms = (energy / samples.len() as f64).sqrt() as f32;

        let dominant_hz = if is_finite && peak > 0.0 {
            let spectrum = power_spectrum(samples);
            let fft_size = (spectrum.len() - 1) * 2;
            spectrum
                .iter()
                .enumerate()
                .skip(1)
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(bin, _)| bin as f32 * sample_rate as f32 / fft_size as f32)
                .unwrap_or(0.0)
        } else {
            0.0
        };

        Self {
            frames: samples.len(),
            peak,
            rms,
            is_finite,
            dominant_hz,
        }
    }

    /// True if the signal contains anything other than zeros
    pub fn is_silent(&self) -> bool {
        self.peak == 0.0
    }
}

/// Share of spectral energy between `low_hz` and `high_hz` (0.0 to 1.0)
///
/// Returns 0 for silent or non-finite input.
pub fn band_energy_ratio(samples: &[f32], sample_rate: u32, low_hz: f32, high_hz: f32) -> f32 {
    if samples.is_empty() || !samples.iter().all(|x| x.is_finite()) {
        return 0.0;
    }

    let spectrum = power_spectrum(samples);
    let fft_size = (spectrum.len() - 1) * 2;
    let bin_hz = sample_rate as f32 / fft_size as f32;

    let total: f64 = spectrum.iter().skip(1).map(|&p| p as f64).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let band: f64 = spectrum
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(bin, _)| {
            let hz = *bin as f32 * bin_hz;
            hz >= low_hz && hz <= high_hz
        })
        .map(|(_, &p)| p as f64)
        .sum();

    (band / total) as f32
}

/// One-sided power spectrum of a Hann-windowed, zero-padded signal
///
/// The FFT size is the next power of two at or above the input length.
fn power_spectrum(samples: &[f32]) -> Vec<f32> {
    let fft_size = samples.len().next_power_of_two().max(2);
    let n = samples.len() as f32;

    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let w = 0.5 - 0.5 * (std::f32::consts::TAU * i as f32 / n).cos();
            Complex::new(x * w, 0.0)
        })
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_size)
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut buffer);

    buffer[..=fft_size / 2].iter().map(|c| c.norm_sqr()).collect()
}
