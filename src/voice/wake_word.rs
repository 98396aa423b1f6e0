//! Wake word detection
//!
//! Works on recognized text: an utterance passes the gate when any wake-word
//! spelling scores above the threshold under `fuzzy::partial_ratio`.

use crate::fuzzy;
use crate::{Error, Result};

/// Fuzzy wake-word gate
#[derive(Debug, Clone)]
pub struct WakeWordDetector {
    wake_words: Vec<String>,
    threshold: u8,
}

impl WakeWordDetector {
    /// Create a new wake word detector
    ///
    /// # Arguments
    ///
    /// * `wake_words` - Accepted spellings (e.g., "соня", "сонечка")
    /// * `threshold` - Similarity a spelling must exceed, 0–100
    ///
    /// # Errors
    ///
    /// Returns error if no usable wake word is given
    pub fn new(wake_words: Vec<String>, threshold: u8) -> Result<Self> {
        let normalized: Vec<String> = wake_words
            .into_iter()
            .map(|w| w.to_lowercase().trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();

        if normalized.is_empty() {
            return Err(Error::Config("no wake words configured".to_string()));
        }

        tracing::debug!(wake_words = ?normalized, threshold, "wake word detector initialized");

        Ok(Self {
            wake_words: normalized,
            threshold,
        })
    }

    /// Highest similarity of any wake word against the utterance
    #[must_use]
    pub fn score(&self, transcript: &str) -> u8 {
        let normalized = transcript.to_lowercase();
        self.wake_words
            .iter()
            .map(|w| fuzzy::partial_ratio(&normalized, w))
            .max()
            .unwrap_or(0)
    }

    /// Check if transcribed text contains a wake word
    #[must_use]
    pub fn check_wake_word(&self, transcript: &str) -> bool {
        let score = self.score(transcript);
        let detected = score > self.threshold;
        if detected {
            tracing::debug!(score, transcript, "wake word detected");
        }
        detected
    }

    /// Remove every wake-word spelling and the separators around it
    #[must_use]
    pub fn strip(&self, transcript: &str) -> String {
        let mut command = transcript.to_lowercase();
        for wake_word in &self.wake_words {
            command = command.replace(wake_word.as_str(), "");
        }
        command
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Get the configured wake words
    #[must_use]
    pub fn wake_words(&self) -> &[String] {
        &self.wake_words
    }

    /// Get the acceptance threshold
    #[must_use]
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> WakeWordDetector {
        WakeWordDetector::new(
            vec![
                "соня".to_string(),
                "сонька".to_string(),
                "сонечка".to_string(),
                "sonya".to_string(),
            ],
            80,
        )
        .unwrap()
    }

    #[test]
    fn test_wake_word_detection() {
        let detector = detector();

        assert!(!detector.check_wake_word("привет как дела"));
        assert!(detector.check_wake_word("соня какой сегодня день"));
        assert!(detector.check_wake_word("Sonya, hello"));
    }

    #[test]
    fn empty_utterance_is_rejected() {
        assert!(!detector().check_wake_word(""));
    }

    #[test]
    fn strip_removes_wake_word_and_punctuation() {
        let detector = detector();
        assert_eq!(detector.strip("Соня, открой браузер"), "открой браузер");
        assert_eq!(detector.strip("сонечка"), "");
        assert_eq!(detector.strip("открой  соня  терминал"), "открой терминал");
    }

    #[test]
    fn empty_word_list_is_an_error() {
        assert!(WakeWordDetector::new(vec!["  ".to_string()], 80).is_err());
    }
}
