//! Speech-to-text with a local vosk model

use std::path::Path;

use vosk::{DecodingState, Model, Recognizer};

use crate::{Error, Result};

/// Streaming recognizer fed with raw PCM blocks
pub struct SpeechRecognizer {
    // Kept alive alongside the recognizer built from it
    _model: Model,
    recognizer: Recognizer,
}

impl SpeechRecognizer {
    /// Load the model at `model_path` and build a recognizer for `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if the model is missing or cannot be loaded
    pub fn new(model_path: &Path, sample_rate: u32) -> Result<Self> {
        if !model_path.exists() {
            return Err(Error::Stt(format!(
                "vosk model not found at {}",
                model_path.display()
            )));
        }

        let path_str = model_path.to_str().ok_or_else(|| {
            Error::Stt(format!(
                "vosk model path is not valid UTF-8: {}",
                model_path.display()
            ))
        })?;

        tracing::info!(path = %model_path.display(), "loading vosk model");
        let model = Model::new(path_str)
            .ok_or_else(|| Error::Stt(format!("failed to load vosk model {path_str}")))?;

        #[allow(clippy::cast_precision_loss)]
        let recognizer = Recognizer::new(&model, sample_rate as f32)
            .ok_or_else(|| Error::Stt("failed to create vosk recognizer".to_string()))?;

        tracing::debug!(sample_rate, "recognizer ready");
        Ok(Self {
            _model: model,
            recognizer,
        })
    }

    /// Feed one block of samples
    ///
    /// Returns the finalized utterance, lower-cased and trimmed, once the
    /// decoder detects its end. An empty string means a finalized silence.
    ///
    /// # Errors
    ///
    /// Returns error if the decoder rejects the block
    pub fn accept(&mut self, samples: &[i16]) -> Result<Option<String>> {
        match self.recognizer.accept_waveform(samples) {
            Ok(DecodingState::Finalized) => {
                let text = self
                    .recognizer
                    .result()
                    .single()
                    .map(|single| single.text.trim().to_lowercase())
                    .unwrap_or_default();
                Ok(Some(text))
            }
            Ok(DecodingState::Running) => Ok(None),
            Ok(DecodingState::Failed) => Err(Error::Stt("decoding failed".to_string())),
            Err(e) => Err(Error::Stt(e.to_string())),
        }
    }

    /// Drop any partially decoded audio
    pub fn reset(&mut self) {
        self.recognizer.reset();
    }
}
