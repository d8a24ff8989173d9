//! Wake word detection
//!
//! Finds wake words in recognized transcripts and separates them from the
//! command that follows. Arming and expiry of the command window belong to
//! the navigation state machine.

use crate::{Error, Result};

/// Detects wake words in transcripts
#[derive(Debug, Clone)]
pub struct WakeWordDetector {
    wake_words: Vec<String>,
}

impl WakeWordDetector {
    /// Create a new wake word detector
    ///
    /// # Arguments
    ///
    /// * `wake_words` - List of wake words to detect (e.g., "ability")
    ///
    /// # Errors
    ///
    /// Returns error if the list is empty or contains a blank wake word
    pub fn new(wake_words: Vec<String>) -> Result<Self> {
        let normalized: Vec<String> = wake_words
            .into_iter()
            .map(|w| w.to_lowercase().trim().to_string())
            .collect();

        if normalized.is_empty() || normalized.iter().any(String::is_empty) {
            return Err(Error::Config("wake word must not be empty".to_string()));
        }

        tracing::debug!(wake_words = ?normalized, "wake word detector initialized");

        Ok(Self {
            wake_words: normalized,
        })
    }

    /// Check if a normalized transcript contains a wake word
    #[must_use]
    pub fn detect(&self, transcript: &str) -> bool {
        self.wake_words.iter().any(|w| transcript.contains(w.as_str()))
    }

    /// Text after the earliest wake word, or the whole transcript if none
    #[must_use]
    pub fn strip<'a>(&self, transcript: &'a str) -> &'a str {
        let earliest = self
            .wake_words
            .iter()
            .filter_map(|w| transcript.find(w.as_str()).map(|pos| pos + w.len()))
            .min();

        earliest.map_or(transcript, |end| {
            transcript[end..]
                .trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == '.')
                .trim_end()
        })
    }

    /// Optional-prefix regex fragment matching any wake word
    #[must_use]
    pub fn pattern_prefix(&self) -> String {
        let alternatives: Vec<String> = self.wake_words.iter().map(|w| regex::escape(w)).collect();
        format!(r"((({})\s*)?)", alternatives.join("|"))
    }

    /// Get the configured wake words
    #[must_use]
    pub fn wake_words(&self) -> &[String] {
        &self.wake_words
    }
}
