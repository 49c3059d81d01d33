use anyhow::Result;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

// Byte mapping range, dBFS. Magnitudes below MIN_DB clamp to 0, above MAX_DB
// to 255.
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// Frequency-magnitude analyser. Holds the FFT plan and a fixed-length byte
/// sample (one per bin, `fft_size / 2` bins) that is overwritten in place on
/// every `process` call; magnitudes are never retained across frames.
pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    bins: Vec<u8>,
    fft_size: usize,
}

impl SpectrumAnalyser {
    pub fn new(fft_size: usize) -> Result<Self> {
        if fft_size == 0 || !fft_size.is_power_of_two() {
            anyhow::bail!("FFT size must be a power of two, got {}", fft_size);
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            fft,
            hann: hann_window(fft_size),
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            bins: vec![0; fft_size / 2],
            fft_size,
        })
    }

    /// The current frequency-magnitude sample.
    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    /// Analyse one window of samples, overwriting the byte sample in place.
    /// `samples` must hold exactly `fft_size` values; shorter input leaves
    /// the previous sample untouched.
    pub fn process(&mut self, samples: &[f32]) {
        if samples.len() < self.fft_size {
            return;
        }

        for i in 0..self.fft_size {
            self.scratch[i] = Complex::new(samples[i] * self.hann[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (bin, c) in self.bins.iter_mut().zip(self.scratch.iter()) {
            let magnitude = c.norm() / self.fft_size as f32;
            *bin = magnitude_to_byte(magnitude);
        }
    }
}

/// Map a linear magnitude to a byte via dBFS, remapping [MIN_DB, MAX_DB]
/// linearly onto [0, 255].
fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let normalized = (db - MIN_DB) / (MAX_DB - MIN_DB);
    (normalized.clamp(0.0, 1.0) * 255.0) as u8
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
