//! Platform speech adapters
//!
//! The engine never touches audio itself. Recognition, synthesis,
//! permissions and the optional external recorder sit behind these traits,
//! and recognition events are pushed back in through
//! [`VoiceNavigator::on_recognition_event`](super::VoiceNavigator::on_recognition_event).

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

/// Options for one recognition session
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    /// Language tag (e.g. "en-US")
    pub language: String,
    /// Emit partial transcripts while the user is speaking
    pub interim_results: bool,
    /// Keep the session open across utterances
    pub continuous: bool,
    /// Ask the platform to punctuate transcripts
    pub punctuation: bool,
    /// Vocabulary hints for the recognizer
    pub context_hints: Vec<String>,
}

impl RecognitionOptions {
    /// Options for listening to navigation commands
    #[must_use]
    pub fn commands(language: &str, context_hints: &[String]) -> Self {
        Self {
            language: language.to_string(),
            interim_results: true,
            continuous: true,
            punctuation: false,
            context_hints: context_hints.to_vec(),
        }
    }

    /// Options for capturing a dictated chat message
    #[must_use]
    pub fn dictation(language: &str) -> Self {
        Self {
            language: language.to_string(),
            interim_results: true,
            continuous: true,
            punctuation: true,
            context_hints: Vec::new(),
        }
    }
}

/// One hypothesis inside a recognition result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

/// Recognizer error classes the engine reacts to differently
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerErrorKind {
    /// Nothing was heard
    NoSpeech,
    /// Session was cancelled
    Aborted,
    /// Recognition service unreachable
    Network,
    /// Anything else, carrying the platform's error code
    Other(String),
}

impl RecognizerErrorKind {
    /// Map a platform error code (e.g. "no-speech") to a kind
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for RecognizerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSpeech => write!(f, "no-speech"),
            Self::Aborted => write!(f, "aborted"),
            Self::Network => write!(f, "network"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Events emitted by the speech recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Audio capture began
    Start,
    /// Session ended, expectedly or not
    End,
    /// Session failed
    Error {
        kind: RecognizerErrorKind,
        message: Option<String>,
    },
    /// New hypotheses; only the first one is used
    Result { results: Vec<RecognitionResult> },
}

impl RecognitionEvent {
    /// Shorthand for a single interim result
    #[must_use]
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self::Result {
            results: vec![RecognitionResult {
                transcript: transcript.into(),
                is_final: false,
            }],
        }
    }

    /// Shorthand for a single final result
    #[must_use]
    pub fn final_result(transcript: impl Into<String>) -> Self {
        Self::Result {
            results: vec![RecognitionResult {
                transcript: transcript.into(),
                is_final: true,
            }],
        }
    }

    /// Shorthand for an error event
    #[must_use]
    pub fn error(kind: RecognizerErrorKind) -> Self {
        Self::Error {
            kind,
            message: None,
        }
    }

    /// The leading hypothesis, if this is a non-empty result
    #[must_use]
    pub fn best(&self) -> Option<&RecognitionResult> {
        match self {
            Self::Result { results } => results
                .first()
                .filter(|r| !r.transcript.trim().is_empty()),
            _ => None,
        }
    }
}

/// Continuous speech recognizer
pub trait SpeechRecognizer: Send + Sync {
    /// Begin a recognition session
    ///
    /// # Errors
    ///
    /// Returns error if the platform refuses to start
    fn start(&self, options: &RecognitionOptions) -> Result<()>;

    /// End the current session
    ///
    /// # Errors
    ///
    /// Returns error if the platform fails to stop
    fn stop(&self) -> Result<()>;
}

/// Playback parameters for one utterance
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechParams {
    pub language: String,
    pub pitch: f32,
    pub rate: f32,
}

/// Lifecycle of one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Done,
    Stopped,
    Failed(String),
}

/// Receives the lifecycle events of one utterance
pub type PlaybackListener = Box<dyn Fn(PlaybackEvent) + Send + Sync>;

/// Text-to-speech engine
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking `text`; `listener` receives the utterance's events
    ///
    /// # Errors
    ///
    /// Returns error if playback cannot begin
    fn speak(&self, text: &str, params: &SpeechParams, listener: PlaybackListener) -> Result<()>;

    /// Interrupt whatever is playing; must be safe with nothing playing
    ///
    /// # Errors
    ///
    /// Returns error if the platform fails to stop playback
    fn stop(&self) -> Result<()>;
}

/// Outcome of a microphone permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionStatus {
    pub granted: bool,
}

/// Grants microphone access
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Ask the platform (and possibly the user) for microphone access
    ///
    /// # Errors
    ///
    /// Returns error if the request itself fails
    async fn request_permission(&self) -> Result<PermissionStatus>;
}

/// External voice-recorder component a screen may delegate dictation to
pub trait RecordingControl: Send + Sync {
    /// Start capturing a voice message
    fn start_recording(&self);

    /// Stop capturing and send what was recorded
    fn stop_and_send(&self);
}

/// Shared handle to a recorder
pub type RecordingHandle = Arc<dyn RecordingControl>;
