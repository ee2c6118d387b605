pub mod beat;
pub mod capture;
#[cfg(feature = "cpal")]
pub mod cpal_capture;
pub mod extractor;
pub mod spectrum;

use serde::{Deserialize, Serialize};

pub use beat::{BeatDetector, SpectralFluxTracker};
pub use capture::{CaptureBackend, CaptureDevice, CaptureError};
#[cfg(feature = "cpal")]
pub use cpal_capture::CpalBackend;
pub use extractor::{FeatureExtractor, FeatureSnapshot};
pub use spectrum::SpectrumAnalyzer;

/// Audio analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Analysis window of the onset detector.
    pub fft_size: usize,
    /// Samples per captured block.
    pub block_size: usize,
    /// Number of logarithmic spectrum bands.
    pub band_count: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            fft_size: 1024,
            block_size: 512,
            band_count: 8,
        }
    }
}
