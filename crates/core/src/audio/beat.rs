//! Onset detection and running tempo estimation.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::AudioConfig;

/// Something that turns a stream of audio blocks into beat onsets and a
/// tempo estimate. Blocks must be fed in capture order.
pub trait BeatDetector: Send {
    /// Consume one block; true when an onset was detected in it.
    fn feed(&mut self, block: &[f32]) -> bool;

    /// Current tempo estimate in BPM, or 0 when unknown.
    fn current_bpm(&self) -> f32;
}

const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 200.0;
/// Seconds of flux kept for the adaptive threshold.
const FLUX_HISTORY_SECONDS: f64 = 1.5;
/// Standard deviations above the mean a frame needs to count as an onset.
const THRESHOLD_DEVIATIONS: f32 = 1.5;
/// Absolute floor so numeric noise during silence never triggers.
const FLUX_FLOOR: f32 = 0.01;
/// Inter-onset intervals the tempo median is taken over.
const INTERVAL_COUNT: usize = 8;

/// Spectral-flux onset detector with a median inter-onset tempo estimate.
///
/// Each block is shifted into an analysis frame of `fft_size` samples, Hann
/// windowed and transformed; the half-wave rectified magnitude increase over
/// the previous frame is the flux. A frame is an onset when its flux clears
/// `mean + 1.5 * std` of the recent flux and the previous onset is at least
/// one beat at `MAX_BPM` ago.
pub struct SpectralFluxTracker {
    sample_rate: u32,
    frame: Vec<f32>,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    previous: Vec<f32>,
    flux_history: VecDeque<f32>,
    flux_history_len: usize,
    samples_seen: u64,
    last_onset: Option<u64>,
    intervals: VecDeque<f64>,
    bpm: f32,
}

impl SpectralFluxTracker {
    pub fn new(config: &AudioConfig) -> Self {
        let fft_size = config.fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (fft_size - 1) as f32).cos()))
            .collect();

        let frames_per_second = config.sample_rate as f64 / config.block_size.max(1) as f64;

        Self {
            sample_rate: config.sample_rate,
            frame: vec![0.0; fft_size],
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            previous: vec![0.0; fft_size / 2 + 1],
            flux_history: VecDeque::new(),
            flux_history_len: ((frames_per_second * FLUX_HISTORY_SECONDS) as usize).max(1),
            samples_seen: 0,
            last_onset: None,
            intervals: VecDeque::with_capacity(INTERVAL_COUNT),
            bpm: 0.0,
        }
    }

    fn flux(&mut self, block: &[f32]) -> f32 {
        let size = self.frame.len();
        let incoming = &block[block.len().saturating_sub(size)..];
        let keep = size - incoming.len();
        self.frame.copy_within(incoming.len().., 0);
        self.frame[keep..].copy_from_slice(incoming);

        for ((slot, sample), w) in self.scratch.iter_mut().zip(&self.frame).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let mut flux = 0.0;
        for (prev, bin) in self.previous.iter_mut().zip(&self.scratch) {
            let magnitude = bin.norm();
            flux += (magnitude - *prev).max(0.0);
            *prev = magnitude;
        }
        flux
    }

    fn threshold(&self) -> f32 {
        if self.flux_history.is_empty() {
            return 0.0;
        }
        let count = self.flux_history.len() as f32;
        let mean = self.flux_history.iter().sum::<f32>() / count;
        let variance = self
            .flux_history
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f32>()
            / count;
        mean + THRESHOLD_DEVIATIONS * variance.sqrt()
    }

    fn record_onset(&mut self, at: u64) {
        if let Some(last) = self.last_onset {
            let interval = (at - last) as f64 / self.sample_rate as f64;
            if (60.0 / MAX_BPM..=60.0 / MIN_BPM).contains(&interval) {
                if self.intervals.len() == INTERVAL_COUNT {
                    self.intervals.pop_front();
                }
                self.intervals.push_back(interval);

                let mut sorted: Vec<f64> = self.intervals.iter().copied().collect();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let median = sorted[sorted.len() / 2];
                self.bpm = (60.0 / median) as f32;
            }
        }
        self.last_onset = Some(at);
    }
}

impl BeatDetector for SpectralFluxTracker {
    fn feed(&mut self, block: &[f32]) -> bool {
        if block.is_empty() {
            return false;
        }

        let flux = self.flux(block);
        let threshold = self.threshold();

        if self.flux_history.len() == self.flux_history_len {
            self.flux_history.pop_front();
        }
        self.flux_history.push_back(flux);

        self.samples_seen += block.len() as u64;
        let now = self.samples_seen;

        let refractory = (self.sample_rate as f64 * 60.0 / MAX_BPM) as u64;
        let rested = self
            .last_onset
            .map_or(true, |last| now.saturating_sub(last) >= refractory);

        let onset = flux > FLUX_FLOOR && flux > threshold && rested;
        if onset {
            self.record_onset(now);
        }
        onset
    }

    fn current_bpm(&self) -> f32 {
        self.bpm
    }
}
