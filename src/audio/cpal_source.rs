//! cpal-based audio source
//!
//! Note: cpal::Stream is not Send, so the stream lives on a dedicated thread
//! and the source talks to it over a channel. The hardware callback converts
//! incoming frames to mono i16 at the target rate and appends them to a
//! shared ring buffer; `read_available` drains that buffer from the engine's
//! capture loop. A `capturing` flag gates the callback so pause/resume do not
//! tear the stream down.

use super::AudioSource;
use crate::config::EngineConfig;
use crate::error::AudioError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Cap on buffered audio; beyond this the oldest samples are dropped
const MAX_BUFFERED_SECS: usize = 10;

/// Commands sent to the stream-owner thread
enum SourceCommand {
    Resume,
    Pause,
    Close,
}

/// cpal-based audio source implementation
pub struct CpalSource {
    cmd_tx: Option<Sender<SourceCommand>>,
    thread_handle: Option<thread::JoinHandle<()>>,
    buffer: Arc<Mutex<VecDeque<i16>>>,
    capturing: Arc<AtomicBool>,
    overflowed: Arc<AtomicBool>,
    closed: bool,
}

/// Shared pieces the hardware callback writes into
struct CallbackShared {
    buffer: Arc<Mutex<VecDeque<i16>>>,
    capturing: Arc<AtomicBool>,
    overflowed: Arc<AtomicBool>,
    max_buffered: usize,
    source_rate: u32,
    target_rate: u32,
    source_channels: usize,
}

impl CpalSource {
    /// Open the configured device and park the stream paused. The stream
    /// thread reports its build result back before this returns, so a bad
    /// device or unsupported format fails here rather than on first resume.
    pub fn open(config: &EngineConfig) -> Result<Self, AudioError> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = cpal::default_host();
        let device = if config.device == "default" {
            host.default_input_device()
                .ok_or_else(|| AudioError::DeviceNotFound("default".to_string()))?
        } else {
            find_audio_device(&host, &config.device)?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("Using audio device: {}", device_name);

        let supported_config = device
            .default_input_config()
            .map_err(|e| AudioError::Connection(e.to_string()))?;

        let source_rate = supported_config.sample_rate().0;
        let source_channels = supported_config.channels() as usize;
        let target_rate = config.sample_rate;
        let sample_format = supported_config.sample_format();

        tracing::debug!(
            "Device config: {} Hz, {} channel(s), format: {:?}",
            source_rate,
            source_channels,
            sample_format
        );

        let buffer = Arc::new(Mutex::new(VecDeque::new()));
        let capturing = Arc::new(AtomicBool::new(false));
        let overflowed = Arc::new(AtomicBool::new(false));

        let (cmd_tx, cmd_rx) = mpsc::channel::<SourceCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();

        let shared = CallbackShared {
            buffer: buffer.clone(),
            capturing: capturing.clone(),
            overflowed: overflowed.clone(),
            max_buffered: target_rate as usize * MAX_BUFFERED_SECS,
            source_rate,
            target_rate,
            source_channels,
        };

        let thread_handle = thread::Builder::new()
            .name("audio-stream".to_string())
            .spawn(move || stream_thread(device, supported_config, shared, cmd_rx, ready_tx))
            .map_err(|e| AudioError::Connection(e.to_string()))?;

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e);
            }
            Err(_) => {
                return Err(AudioError::Stream(
                    "audio stream thread did not come up".to_string(),
                ))
            }
        }

        Ok(Self {
            cmd_tx: Some(cmd_tx),
            thread_handle: Some(thread_handle),
            buffer,
            capturing,
            overflowed,
            closed: false,
        })
    }

    fn send_command(&self, cmd: SourceCommand) -> Result<(), AudioError> {
        self.cmd_tx
            .as_ref()
            .ok_or(AudioError::SourceClosed)?
            .send(cmd)
            .map_err(|_| AudioError::SourceClosed)
    }
}

impl AudioSource for CpalSource {
    fn resume(&mut self) -> Result<(), AudioError> {
        if self.closed {
            return Err(AudioError::SourceClosed);
        }
        self.buffer.lock().unwrap_or_else(|p| p.into_inner()).clear();
        self.overflowed.store(false, Ordering::SeqCst);
        self.send_command(SourceCommand::Resume)
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        if self.closed {
            return Err(AudioError::SourceClosed);
        }
        self.send_command(SourceCommand::Pause)
    }

    fn read_available(&mut self, max: usize) -> Result<Vec<i16>, AudioError> {
        if self.closed {
            return Err(AudioError::SourceClosed);
        }
        if self.overflowed.swap(false, Ordering::SeqCst) {
            return Err(AudioError::Overflow);
        }
        let mut guard = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
        let take = guard.len().min(max);
        Ok(guard.drain(..take).collect())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let _ = cmd_tx.send(SourceCommand::Close);
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        tracing::debug!("Audio source closed");
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Body of the stream-owner thread. Builds the stream, reports the result,
/// then services pause/resume until told to close.
fn stream_thread(
    device: cpal::Device,
    supported_config: cpal::SupportedStreamConfig,
    shared: CallbackShared,
    cmd_rx: Receiver<SourceCommand>,
    ready_tx: Sender<Result<(), AudioError>>,
) {
    use cpal::traits::StreamTrait;

    let stream_config = cpal::StreamConfig {
        channels: supported_config.channels(),
        sample_rate: supported_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err| tracing::error!("Audio stream error: {}", err);
    let capturing = shared.capturing.clone();

    let stream_result = match supported_config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, shared, err_fn),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, shared, err_fn),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, shared, err_fn),
        format => Err(AudioError::Stream(format!(
            "unsupported sample format: {:?}",
            format
        ))),
    };

    let stream = match stream_result {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // The stream stays alive for the life of the thread; the capturing flag
    // gates whether the callback keeps anything.
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
        return;
    }
    let _ = ready_tx.send(Ok(()));
    tracing::debug!("Audio stream thread started");

    loop {
        match cmd_rx.recv() {
            Ok(SourceCommand::Resume) => capturing.store(true, Ordering::SeqCst),
            Ok(SourceCommand::Pause) => capturing.store(false, Ordering::SeqCst),
            Ok(SourceCommand::Close) | Err(_) => break,
        }
    }

    drop(stream);
    tracing::debug!("Audio stream thread stopped");
}

/// Build an input stream for a specific sample type
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: CallbackShared,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    let CallbackShared {
        buffer,
        capturing,
        overflowed,
        max_buffered,
        source_rate,
        target_rate,
        source_channels,
    } = shared;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !capturing.load(Ordering::SeqCst) {
                    return;
                }

                // Mix to mono f32
                let mono: Vec<f32> = data
                    .chunks(source_channels)
                    .map(|frame| {
                        let sum: f32 = frame
                            .iter()
                            .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                            .sum();
                        sum / source_channels as f32
                    })
                    .collect();

                let resampled = if source_rate != target_rate {
                    resample(&mono, source_rate, target_rate)
                } else {
                    mono
                };

                let mut guard = buffer.lock().unwrap_or_else(|p| p.into_inner());
                guard.extend(resampled.iter().map(|&s| to_i16(s)));
                if guard.len() > max_buffered {
                    let excess = guard.len() - max_buffered;
                    guard.drain(..excess);
                    overflowed.store(true, Ordering::SeqCst);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))?;

    Ok(stream)
}

/// Find an audio input device by name: exact match first, then a
/// case-insensitive substring match.
fn find_audio_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let mut devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?
        .collect();

    let search_lower = device_name.to_lowercase();
    let mut exact: Option<usize> = None;
    let mut fallback: Option<usize> = None;

    for (i, device) in devices.iter().enumerate() {
        let Ok(name) = device.name() else { continue };
        if name == device_name {
            exact = Some(i);
            break;
        }
        if fallback.is_none() && name.to_lowercase().contains(&search_lower) {
            fallback = Some(i);
        }
    }

    match exact.or(fallback) {
        Some(i) => {
            let name = devices[i].name().unwrap_or_default();
            tracing::debug!(
                "Found audio device: {} (searched for: {})",
                name,
                device_name
            );
            Ok(devices.swap_remove(i))
        }
        None => Err(AudioError::DeviceNotFound(device_name.to_string())),
    }
}

/// Clamp an f32 sample into i16 range
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Linear interpolation resampling
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.get(idx).copied().unwrap_or(0.0)
        };

        output.push(sample);
    }

    output
}
