//! Error types for voxwin
//!
//! Uses thiserror for ergonomic error definitions. Fatal errors (model or
//! device load, bad config) abort startup; everything downstream of a running
//! engine surfaces through callbacks or boolean send results instead.

use thiserror::Error;

/// Top-level error type for the voxwin application
#[derive(Error, Debug)]
pub enum VoxwinError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the recognition engine lifecycle
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Init(String),

    #[error("Engine has been cleaned up; no further operations are valid")]
    Closed,

    #[error("Engine is busy: {0}")]
    Busy(String),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
}

/// Errors from the audio capture layer
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio device not found: '{0}'")]
    DeviceNotFound(String),

    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Input buffer overflowed")]
    Overflow,

    #[error("Audio source is closed")]
    SourceClosed,
}

impl AudioError {
    /// Overflow is the only per-read failure the capture loop rides out.
    pub fn is_transient(&self) -> bool {
        matches!(self, AudioError::Overflow)
    }
}

/// Errors from the streaming speech decoder
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Decoder initialization failed: {0}")]
    InitFailed(String),

    #[error("Decode failed: {0}")]
    DecodeFailed(String),
}

/// Errors from a result sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication rejected (check the API key)")]
    Auth,

    #[error("All {attempts} attempts exhausted")]
    Exhausted { attempts: u32 },

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the serial actuator transport
#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("No actuator device found on any serial port")]
    NoDeviceFound,

    #[error("Failed to open serial port '{port}': {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Not connected to an actuator")]
    NotConnected,

    #[error("Every encoding/terminator combination failed for command '{0}'")]
    AllPatternsFailed(String),
}

/// Result type alias using VoxwinError
pub type Result<T> = std::result::Result<T, VoxwinError>;
