//! Terminal platform adapters
//!
//! Stand-ins for the platform speech services so the engine can be driven
//! from a terminal: recognition events are typed as lines, speech is printed.
//!
//! Line format:
//! - `~text` interim transcript
//! - `text` final transcript
//! - `!code` recognizer error (`no-speech`, `aborted`, `network`, ...)
//! - `.` recognizer end

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::Result;
use crate::voice::{
    PermissionProvider, PermissionStatus, PlaybackEvent, PlaybackListener, RecognitionEvent,
    RecognitionOptions, RecognizerErrorKind, SpeechParams, SpeechRecognizer, SpeechSynthesizer,
};

/// Parse one input line into a recognition event
///
/// Blank lines yield `None`.
#[must_use]
pub fn parse_line(line: &str) -> Option<RecognitionEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line == "." {
        return Some(RecognitionEvent::End);
    }

    if let Some(code) = line.strip_prefix('!') {
        return Some(RecognitionEvent::error(RecognizerErrorKind::from_code(code.trim())));
    }

    if let Some(text) = line.strip_prefix('~') {
        return Some(RecognitionEvent::interim(text.trim()));
    }

    Some(RecognitionEvent::final_result(line))
}

/// Recognizer that only reports whether it would be capturing
#[derive(Debug, Default)]
pub struct ConsoleRecognizer {
    active: AtomicBool,
}

impl ConsoleRecognizer {
    /// Whether a session is open
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&self, options: &RecognitionOptions) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        let mode = if options.punctuation { "dictation" } else { "commands" };
        println!("[mic on: {mode}]");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if self.active.swap(false, Ordering::SeqCst) {
            println!("[mic off]");
        }
        Ok(())
    }
}

/// Synthesizer that prints instead of speaking
///
/// Utterances complete as soon as they are printed.
#[derive(Debug, Default)]
pub struct ConsoleSynthesizer;

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn speak(&self, text: &str, params: &SpeechParams, listener: PlaybackListener) -> Result<()> {
        println!("[say {}] {text}", params.language);
        listener(PlaybackEvent::Started);
        listener(PlaybackEvent::Done);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Permission provider with a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct FixedPermission {
    pub granted: bool,
}

#[async_trait]
impl PermissionProvider for FixedPermission {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus {
            granted: self.granted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::RecognitionResult;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("."), Some(RecognitionEvent::End));
        assert_eq!(
            parse_line("!network"),
            Some(RecognitionEvent::error(RecognizerErrorKind::Network))
        );
        assert_eq!(
            parse_line("~ability open"),
            Some(RecognitionEvent::Result {
                results: vec![RecognitionResult {
                    transcript: "ability open".to_string(),
                    is_final: false,
                }],
            })
        );
        assert_eq!(parse_line(" open home "), Some(RecognitionEvent::final_result("open home")));
    }

    #[test]
    fn test_recognizer_tracks_session() {
        let recognizer = ConsoleRecognizer::default();
        recognizer.start(&RecognitionOptions::dictation("en-US")).unwrap();
        assert!(recognizer.is_active());
        recognizer.stop().unwrap();
        assert!(!recognizer.is_active());
    }
}
