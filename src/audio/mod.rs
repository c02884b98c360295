//! Audio input module
//!
//! Provides microphone capture using cpal, which works with PipeWire,
//! PulseAudio, and ALSA backends. The engine pulls samples rather than
//! receiving pushes, so a source buffers between the hardware callback and
//! the capture loop.

pub mod cpal_source;

use crate::config::EngineConfig;
use crate::error::AudioError;

/// Trait for pull-based audio source implementations
pub trait AudioSource: Send {
    /// Start (or restart) feeding the internal buffer
    fn resume(&mut self) -> Result<(), AudioError>;

    /// Stop feeding the buffer; already-buffered samples remain readable
    fn pause(&mut self) -> Result<(), AudioError>;

    /// Drain up to `max` buffered samples (i16 mono at the configured rate).
    /// An empty vec means nothing has arrived yet, not end-of-stream.
    fn read_available(&mut self, max: usize) -> Result<Vec<i16>, AudioError>;

    /// Release the device. Further reads fail with `SourceClosed`.
    fn close(&mut self);
}

/// Factory function to open an audio source
pub fn create_source(config: &EngineConfig) -> Result<Box<dyn AudioSource>, AudioError> {
    Ok(Box::new(cpal_source::CpalSource::open(config)?))
}

/// One input device, as shown by `voxwin devices`
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub is_default: bool,
}

/// Enumerate input devices on the default host
pub fn list_input_devices() -> Result<Vec<DeviceInfo>, AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for (index, device) in host
        .input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?
        .enumerate()
    {
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let (channels, sample_rate) = match device.default_input_config() {
            Ok(cfg) => (cfg.channels(), cfg.sample_rate().0),
            Err(_) => (0, 0),
        };
        let is_default = default_name.as_deref() == Some(name.as_str());
        devices.push(DeviceInfo {
            index,
            name,
            channels,
            sample_rate,
            is_default,
        });
    }

    Ok(devices)
}
