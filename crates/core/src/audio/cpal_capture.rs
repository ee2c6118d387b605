//! Microphone capture through cpal.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig, SupportedStreamConfigRange};

use super::capture::{CaptureBackend, CaptureDevice, CaptureError};

/// Device name that selects the host's default input.
pub const DEFAULT_DEVICE: &str = "default";

const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Capture backend over the default cpal host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }

    fn find_device(&self, name: &str) -> Result<Device, CaptureError> {
        let host = cpal::default_host();

        if name.is_empty() || name == DEFAULT_DEVICE {
            return host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()));
        }

        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::Open(e.to_string()))?;
        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name == name {
                    return Ok(device);
                }
            }
        }

        Err(CaptureError::DeviceNotFound(name.to_string()))
    }

    /// Pick an f32 input config at `sample_rate`, falling back to the
    /// device default when no range covers it.
    fn find_config(
        &self,
        device: &Device,
        name: &str,
        sample_rate: u32,
        channels: u16,
    ) -> Result<StreamConfig, CaptureError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::Open(e.to_string()))?;
        if let Some(config) = select_config(supported_configs, sample_rate, channels) {
            return Ok(config);
        }

        let default_config = device
            .default_input_config()
            .map_err(|e| CaptureError::Open(e.to_string()))?;
        if default_config.sample_format() != SampleFormat::F32 {
            return Err(CaptureError::UnsupportedFormat {
                device: name.to_string(),
                format: format!("{:?}", default_config.sample_format()),
                sample_rate: default_config.sample_rate(),
            });
        }

        log::warn!(
            "'{}' has no f32 input at {} Hz, using default ({} channels @ {} Hz)",
            name,
            sample_rate,
            default_config.channels(),
            default_config.sample_rate()
        );
        Ok(default_config.into())
    }
}

/// First f32 range with enough channels whose rates cover `sample_rate`.
fn select_config(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    sample_rate: u32,
    channels: u16,
) -> Option<StreamConfig> {
    ranges
        .into_iter()
        .find(|range| {
            range.sample_format() == SampleFormat::F32
                && range.channels() >= channels.max(1)
                && sample_rate >= range.min_sample_rate()
                && sample_rate <= range.max_sample_rate()
        })
        .map(|range| range.with_sample_rate(sample_rate).into())
}

impl CaptureBackend for CpalBackend {
    fn open(
        &self,
        device: &str,
        sample_rate: u32,
        channels: u16,
        _block_size: usize,
    ) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let input = self.find_device(device)?;
        // Multi-channel streams are downmixed in the callback
        let config = self.find_config(&input, device, sample_rate, channels)?;
        let device_channels = config.channels;
        let stream_rate = config.sample_rate;

        let (tx, rx) = mpsc::channel::<Vec<f32>>();
        let frame_width = device_channels as usize;

        let stream = input
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<f32> = data
                        .chunks(frame_width)
                        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                        .collect();
                    // Receiver gone means the device is being closed
                    let _ = tx.send(mono);
                },
                |err| {
                    log::error!("Audio capture stream error: {}", err);
                },
                None,
            )
            .map_err(|e| CaptureError::Open(e.to_string()))?;
        stream
            .play()
            .map_err(|e| CaptureError::Open(e.to_string()))?;

        log::info!(
            "Capturing from '{}': {} channel(s) @ {} Hz",
            device,
            device_channels,
            stream_rate
        );

        Ok(Box::new(CpalCapture {
            _stream: stream,
            rx,
            pending: VecDeque::new(),
        }))
    }
}

struct CpalCapture {
    _stream: Stream,
    rx: Receiver<Vec<f32>>,
    pending: VecDeque<f32>,
}

impl CaptureDevice for CpalCapture {
    fn read(&mut self, block_size: usize) -> Result<Vec<f32>, CaptureError> {
        while self.pending.len() < block_size {
            match self.rx.recv_timeout(READ_TIMEOUT) {
                Ok(chunk) => self.pending.extend(chunk),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CaptureError::Read("timed out waiting for samples".to_string()))
                }
                Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::Closed),
            }
        }
        Ok(self.pending.drain(..block_size).collect())
    }
}

#[cfg(test)]
mod tests {
    use cpal::SupportedBufferSize;

    use super::*;

    fn range(
        channels: u16,
        min: u32,
        max: u32,
        format: SampleFormat,
    ) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(channels, min, max, SupportedBufferSize::Unknown, format)
    }

    #[test]
    fn test_select_config_requires_f32_at_rate() {
        let ranges = vec![
            range(2, 8000, 96000, SampleFormat::I16),
            range(1, 48000, 48000, SampleFormat::F32),
            range(2, 8000, 96000, SampleFormat::F32),
        ];
        let config = select_config(ranges, 44100, 1).unwrap();
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate, 44100);
    }

    #[test]
    fn test_select_config_without_match() {
        let ranges = vec![
            range(2, 8000, 96000, SampleFormat::I16),
            range(1, 48000, 48000, SampleFormat::F32),
        ];
        assert!(select_config(ranges, 44100, 1).is_none());
        assert!(select_config(Vec::new(), 44100, 1).is_none());
    }
}
