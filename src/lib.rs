//! Ability Voice - Hands-free navigation for a chat assistant
//!
//! This library provides the voice command engine behind the app:
//! - Wake word gating ("ability") with a short command window
//! - Debounced command recognition with a keyword fast path
//! - Dictation of chat messages by voice
//! - Spoken feedback and assistant reply playback with barge-in
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Host screens                       │
//! │   Welcome  │  Profile  │  Voice chat  │  Text chat   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ ScreenBinding
//! ┌────────────────────▼────────────────────────────────┐
//! │                 VoiceNavigator                       │
//! │   NavigationSession  │  Timer task  │  Playback     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Platform adapters                       │
//! │   Recognizer  │  Synthesizer  │  Permissions        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use voice::{
    ChatSpeechCoordinator, CommandInterpreter, FilePreferenceStore, Platform, PreferenceStore,
    RecognitionEvent, Route, Screen, ScreenBinding, VoiceNavigator,
};
