use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

use super::beat::{BeatDetector, SpectralFluxTracker};
use super::capture::CaptureBackend;
use super::spectrum::SpectrumAnalyzer;
use super::AudioConfig;

/// How long to wait before retrying a missing or failed capture device.
const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// The latest audio features, published whole after every analysed block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureSnapshot {
    /// An onset was detected in the most recent block.
    pub beat: bool,
    /// Running tempo estimate in BPM, 0 when unknown.
    pub tempo: f32,
    /// Normalized band magnitudes in `[0, 1]`.
    pub spectrum: Vec<f32>,
}

/// Turns captured audio into beat, tempo and spectrum snapshots.
///
/// Runs on its own thread and is the only writer of the snapshot. Analysis
/// happens only while `enabled` is set; blocks are still read from the device
/// while disabled so the stream never backs up.
pub struct FeatureExtractor {
    config: AudioConfig,
    detector: Box<dyn BeatDetector>,
    spectrum: SpectrumAnalyzer,
    snapshot: Arc<RwLock<FeatureSnapshot>>,
    enabled: Arc<AtomicBool>,
    retry_interval: Duration,
}

impl FeatureExtractor {
    pub fn new(config: AudioConfig, enabled: Arc<AtomicBool>) -> Self {
        let detector = Box::new(SpectralFluxTracker::new(&config));
        Self::with_detector(config, detector, enabled)
    }

    pub fn with_detector(
        config: AudioConfig,
        detector: Box<dyn BeatDetector>,
        enabled: Arc<AtomicBool>,
    ) -> Self {
        let spectrum = SpectrumAnalyzer::new(&config);
        let snapshot = FeatureSnapshot {
            beat: false,
            tempo: 0.0,
            spectrum: vec![0.0; config.band_count],
        };

        Self {
            config,
            detector,
            spectrum,
            snapshot: Arc::new(RwLock::new(snapshot)),
            enabled,
            retry_interval: RETRY_INTERVAL,
        }
    }

    pub fn set_retry_interval(&mut self, interval: Duration) {
        self.retry_interval = interval;
    }

    pub fn snapshot_handle(&self) -> Arc<RwLock<FeatureSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Analyse one block and publish the result. Does nothing while disabled.
    pub fn process_block(&mut self, block: &[f32]) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }

        let beat = self.detector.feed(block);
        let tempo = self.detector.current_bpm();
        self.spectrum.process(block);

        *self.snapshot.write() = FeatureSnapshot {
            beat,
            tempo,
            spectrum: self.spectrum.adjusted().to_vec(),
        };
    }

    /// Capture loop. Opens whichever device `device` names, reads blocks until
    /// the selection changes or the device fails, and starts over. Returns once
    /// `running` is cleared.
    pub fn run(
        mut self,
        backend: Arc<dyn CaptureBackend>,
        device: Arc<RwLock<Option<String>>>,
        running: Arc<AtomicBool>,
    ) {
        log::info!("Feature extractor started");

        while running.load(Ordering::Relaxed) {
            let Some(name) = device.read().clone() else {
                // No microphone selected, try again later
                thread::sleep(self.retry_interval);
                continue;
            };

            let mut capture = match backend.open(
                &name,
                self.config.sample_rate,
                1,
                self.config.block_size,
            ) {
                Ok(capture) => capture,
                Err(e) => {
                    log::warn!("Failed to open audio device '{}': {}", name, e);
                    thread::sleep(self.retry_interval);
                    continue;
                }
            };
            log::info!("Audio capture opened on '{}'", name);

            while running.load(Ordering::Relaxed)
                && device.read().as_deref() == Some(name.as_str())
            {
                match capture.read(self.config.block_size) {
                    Ok(block) => self.process_block(&block),
                    Err(e) => {
                        log::error!("Audio capture on '{}' failed: {}", name, e);
                        thread::sleep(self.retry_interval);
                        break;
                    }
                }
            }

            log::info!("Audio capture closed on '{}'", name);
        }

        log::info!("Feature extractor stopped");
    }

    pub fn spawn(
        self,
        backend: Arc<dyn CaptureBackend>,
        device: Arc<RwLock<Option<String>>>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("feature-extractor".to_string())
            .spawn(move || self.run(backend, device, running))
    }
}
