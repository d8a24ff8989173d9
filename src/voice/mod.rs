//! Voice navigation module
//!
//! Handles wake word detection, command interpretation, dictation, and
//! spoken feedback. Recognition and synthesis are platform adapters (see
//! `adapters.rs`).

mod adapters;
mod command;
mod machine;
mod navigator;
mod playback;
mod preference;
mod text;
mod wake_word;

pub use adapters::{
    PermissionProvider, PermissionStatus, PlaybackEvent, PlaybackListener, RecognitionEvent,
    RecognitionOptions, RecognitionResult, RecognizerErrorKind, RecordingControl, RecordingHandle,
    SpeechParams, SpeechRecognizer, SpeechSynthesizer,
};
pub use command::{
    Command, CommandInterpreter, Interpretation, Route, Screen, TRIGGER_KEYWORDS,
    has_trigger_keyword, help_text, normalize, not_understood,
};
pub use machine::{
    Capabilities, DictationSink, DictationStep, Effect, ExecutionStep, NavigationSession, State,
    Status,
};
pub use navigator::{
    LogoutFn, NavigateFn, Platform, ScreenBinding, SendMessageFn, VoiceNavigator,
};
pub use playback::{ChatSpeechCoordinator, SpeechCallback};
pub use preference::{FilePreferenceStore, MemoryPreferenceStore, PREFERENCE_KEY, PreferenceStore};
pub use text::clean_for_speech;
pub use wake_word::WakeWordDetector;
