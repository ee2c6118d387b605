//! Audio capture device seam.
//!
//! The extractor only needs blocking block reads from whichever device is
//! currently selected. Devices are opened on the capture thread and never
//! leave it, so they don't need to be `Send`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio device '{0}' not found")]
    DeviceNotFound(String),
    #[error("failed to open audio device: {0}")]
    Open(String),
    #[error("audio device '{device}' has no f32 input (default is {format} @ {sample_rate} Hz)")]
    UnsupportedFormat {
        device: String,
        format: String,
        sample_rate: u32,
    },
    #[error("audio read failed: {0}")]
    Read(String),
    #[error("audio stream closed")]
    Closed,
}

/// An open capture stream producing mono PCM.
pub trait CaptureDevice {
    /// Block until `block_size` samples are available and return them.
    fn read(&mut self, block_size: usize) -> Result<Vec<f32>, CaptureError>;
}

/// Opens capture devices by name.
pub trait CaptureBackend: Send + Sync {
    fn open(
        &self,
        device: &str,
        sample_rate: u32,
        channels: u16,
        block_size: usize,
    ) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_names_the_format() {
        let error = CaptureError::UnsupportedFormat {
            device: "USB Mic".to_string(),
            format: "I16".to_string(),
            sample_rate: 48000,
        };
        assert_eq!(
            error.to_string(),
            "audio device 'USB Mic' has no f32 input (default is I16 @ 48000 Hz)"
        );
    }
}
