//! Logarithmic band spectrum with per-band automatic gain.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::AudioConfig;

/// Seconds of raw band values kept for normalization.
const HISTORY_SECONDS: f64 = 5.0;
/// Seconds of the newest raw values averaged into the output.
const AVERAGE_SECONDS: f64 = 0.05;

/// Upper frequency of each band: `sample_rate * 2^(i - band_count)`.
pub fn band_boundaries(sample_rate: u32, band_count: usize) -> Vec<f64> {
    (0..band_count)
        .map(|i| sample_rate as f64 * 2f64.powi(i as i32 - band_count as i32))
        .collect()
}

/// Bin ranges `[lower, upper)` of each band for an FFT over `buffer_len`
/// samples. Band 0 starts at DC.
pub fn band_windows(sample_rate: u32, band_count: usize, buffer_len: usize) -> Vec<(usize, usize)> {
    let bin = |freq: f64| ((freq * buffer_len as f64) / sample_rate as f64) as usize;
    let uppers = band_boundaries(sample_rate, band_count);

    let mut lower = 0.0;
    uppers
        .into_iter()
        .map(|upper| {
            let window = (bin(lower), bin(upper));
            lower = upper;
            window
        })
        .collect()
}

/// Bounded newest-first history of one band's raw magnitude.
#[derive(Debug, Clone)]
pub struct BandHistory {
    values: VecDeque<f32>,
    capacity: usize,
    average_len: usize,
}

impl BandHistory {
    pub fn new(capacity: usize, average_len: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            average_len: average_len.clamp(1, capacity),
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() == self.capacity {
            self.values.pop_back();
        }
        self.values.push_front(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the newest `average_len` entries (the head of the
    /// newest-first ring) relative to the loudest entry in the history,
    /// capped at 1. Zero while the history is silent.
    pub fn adjusted(&self) -> f32 {
        let max = self.values.iter().copied().fold(0.0f32, f32::max);
        if max <= 0.0 {
            return 0.0;
        }

        let recent = self.values.len().min(self.average_len);
        let sum: f32 = self.values.iter().take(recent).sum();
        (sum / recent as f32 / max).clamp(0.0, 1.0)
    }
}

/// Rolling-buffer FFT split into logarithmic bands.
pub struct SpectrumAnalyzer {
    block_size: usize,
    buffer: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    windows: Vec<(usize, usize)>,
    raw: Vec<f32>,
    histories: Vec<BandHistory>,
    adjusted: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(config: &AudioConfig) -> Self {
        let buffer_len = config.block_size * 2;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(buffer_len);

        let blocks_per_second = config.sample_rate as f64 / config.block_size as f64;
        let history_len = (blocks_per_second * HISTORY_SECONDS) as usize;
        let average_len = (blocks_per_second * AVERAGE_SECONDS) as usize;

        Self {
            block_size: config.block_size,
            buffer: vec![0.0; buffer_len],
            fft,
            scratch: vec![Complex::new(0.0, 0.0); buffer_len],
            windows: band_windows(config.sample_rate, config.band_count, buffer_len),
            raw: vec![0.0; config.band_count],
            histories: vec![BandHistory::new(history_len, average_len); config.band_count],
            adjusted: vec![0.0; config.band_count],
        }
    }

    pub fn band_count(&self) -> usize {
        self.windows.len()
    }

    /// Shift one block into the rolling buffer and recompute every band.
    /// Short blocks are zero-padded, long ones truncated.
    pub fn process(&mut self, block: &[f32]) {
        let n = self.block_size;
        let len = self.buffer.len();
        self.buffer.copy_within(0..len - n, n);
        let take = block.len().min(n);
        self.buffer[..take].copy_from_slice(&block[..take]);
        self.buffer[take..n].fill(0.0);

        for (slot, sample) in self.scratch.iter_mut().zip(&self.buffer) {
            *slot = Complex::new(*sample, 0.0);
        }
        self.fft.process(&mut self.scratch);

        // Real input: only the non-negative frequencies are meaningful
        let magnitudes = &self.scratch[..self.buffer.len() / 2 + 1];

        for (band, (lower, upper)) in self.windows.iter().enumerate() {
            let upper = (*upper).min(magnitudes.len());
            let raw = if *lower < upper {
                let bins = &magnitudes[*lower..upper];
                bins.iter().map(|c| c.norm()).sum::<f32>() / bins.len() as f32
            } else {
                0.0
            };

            self.raw[band] = raw;
            self.histories[band].push(raw);
            self.adjusted[band] = self.histories[band].adjusted();
        }
    }

    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    /// Normalized band values in `[0, 1]`.
    pub fn adjusted(&self) -> &[f32] {
        &self.adjusted
    }
}
