//! Voxwin: voice-controlled window actuation
//!
//! This library provides the core functionality for:
//! - Capturing microphone audio via cpal (PipeWire, PulseAudio, ALSA)
//! - Streaming speech recognition with a local Vosk model
//! - Fanning recognition results out to console, file, and remote sinks
//! - Interpreting utterances through an OpenAI-compatible chat API
//! - Driving a window actuator over a USB serial link
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────────┐      ┌───────────────────┐      ┌──────────────────┐
//!   │    Audio     │ i16  │    Recognition    │      │      Result      │
//!   │    (cpal)    │─────▶│      Engine       │─────▶│    Dispatcher    │
//!   └──────────────┘      │   (vosk decode)   │      └──────────────────┘
//!                         └───────────────────┘           │    │    │
//!                                                         ▼    ▼    ▼
//!                                                ┌─────────┐ ┌────┐ ┌────────┐
//!                                                │ console │ │file│ │ remote │
//!                                                └─────────┘ └────┘ │ (ureq) │
//!                                                                   └────────┘
//!                                                                        │
//!                                                  command translation   ▼
//!                                                ┌──────────────────────────┐
//!                                                │    Actuator transport    │
//!                                                │       (serialport)       │
//!                                                └──────────────────────────┘
//! ```

pub mod actuator;
pub mod audio;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod state;

pub use config::{load_config, Config};
pub use engine::{EngineStatus, EventHandler, RecognitionEngine};
pub use error::{Result, VoxwinError};
pub use state::EngineState;
