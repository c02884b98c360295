//! Streaming speech decoder seam
//!
//! The engine feeds fixed-size i16 chunks into a decoder and acts on what
//! comes back: a finalized utterance, an in-progress partial, or silence.

use crate::config::EngineConfig;
use crate::error::DecodeError;

/// Outcome of feeding one chunk into the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// An utterance boundary was reached; the text is final
    Final(String),
    /// An in-progress hypothesis that may still change
    Partial(String),
    /// Nothing recognizable in this chunk
    Silence,
}

/// Trait for streaming speech decoder implementations
pub trait SpeechDecoder: Send {
    /// Feed one chunk of mono i16 samples
    fn accept(&mut self, samples: &[i16]) -> Result<Decoded, DecodeError>;

    /// Flush whatever the decoder is still holding at end of session
    fn finalize(&mut self) -> Result<Option<String>, DecodeError>;

    /// Discard in-flight state so the next session starts clean
    fn reset(&mut self) -> Result<(), DecodeError>;
}

/// Factory function to create the configured decoder
pub fn create_decoder(config: &EngineConfig) -> Result<Box<dyn SpeechDecoder>, DecodeError> {
    tracing::info!(
        "Creating decoder: model={}, sample_rate={}",
        config.model_path,
        config.sample_rate
    );
    Ok(Box::new(super::vosk::VoskDecoder::new(
        &config.model_path,
        config.sample_rate,
    )?))
}
