//! Vosk-backed streaming decoder
//!
//! Wraps the vosk crate's Model/Recognizer pair behind the SpeechDecoder
//! trait. Vosk segments utterances itself: accept_waveform reports Running
//! while a hypothesis is forming and Finalized once it decides the utterance
//! ended.

use super::decoder::{Decoded, SpeechDecoder};
use crate::error::DecodeError;
use std::path::Path;
use vosk::{DecodingState, Model, Recognizer};

/// Streaming decoder backed by a local Vosk model
pub struct VoskDecoder {
    // Held so the recognizer's model outlives it
    _model: Model,
    recognizer: Recognizer,
}

impl VoskDecoder {
    pub fn new(model_path: &str, sample_rate: u32) -> Result<Self, DecodeError> {
        if !Path::new(model_path).exists() {
            return Err(DecodeError::ModelNotFound(model_path.to_string()));
        }

        // Vosk's native logging is noisy at startup
        vosk::set_log_level(vosk::LogLevel::Error);

        let model = Model::new(model_path)
            .ok_or_else(|| DecodeError::InitFailed(format!("failed to load model from '{}'", model_path)))?;

        let recognizer = Recognizer::new(&model, sample_rate as f32)
            .ok_or_else(|| DecodeError::InitFailed("failed to create recognizer".to_string()))?;

        tracing::info!("Vosk model loaded from {}", model_path);

        Ok(Self {
            _model: model,
            recognizer,
        })
    }
}

impl SpeechDecoder for VoskDecoder {
    fn accept(&mut self, samples: &[i16]) -> Result<Decoded, DecodeError> {
        if samples.is_empty() {
            return Ok(Decoded::Silence);
        }

        let state = self
            .recognizer
            .accept_waveform(samples)
            .map_err(|e| DecodeError::DecodeFailed(format!("{:?}", e)))?;

        match state {
            DecodingState::Finalized => {
                let text = self
                    .recognizer
                    .result()
                    .single()
                    .map(|r| r.text.to_string())
                    .unwrap_or_default();
                if text.is_empty() {
                    Ok(Decoded::Silence)
                } else {
                    Ok(Decoded::Final(text))
                }
            }
            DecodingState::Running => {
                let partial = self.recognizer.partial_result().partial.to_string();
                if partial.is_empty() {
                    Ok(Decoded::Silence)
                } else {
                    Ok(Decoded::Partial(partial))
                }
            }
            DecodingState::Failed => {
                Err(DecodeError::DecodeFailed("recognizer rejected waveform".to_string()))
            }
        }
    }

    fn finalize(&mut self) -> Result<Option<String>, DecodeError> {
        let text = self
            .recognizer
            .final_result()
            .single()
            .map(|r| r.text.to_string())
            .unwrap_or_default();
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn reset(&mut self) -> Result<(), DecodeError> {
        self.recognizer.reset();
        Ok(())
    }
}
