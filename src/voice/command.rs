//! Voice command interpretation
//!
//! Classifies a lower-cased transcript as a navigation command, a dictation
//! request, logout, help, a bare wake word, or nothing recognisable.

use std::str::FromStr;

use regex::RegexSet;

use super::WakeWordDetector;
use crate::{Error, Result};

/// Words that make a transcript eligible for immediate execution
pub const TRIGGER_KEYWORDS: [&str; 7] = ["open", "start", "go", "logout", "help", "show", "guide"];

const NOT_UNDERSTOOD: &str = "I didn't understand. Try again.";

/// Screen the user is currently on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Welcome,
    Profile,
    VoiceChat,
    TextChat,
}

impl Screen {
    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Profile => "profile",
            Self::VoiceChat => "voice-chat",
            Self::TextChat => "text-chat",
        }
    }

    /// Whether this is one of the chat screens
    #[must_use]
    pub const fn is_chat(self) -> bool {
        matches!(self, Self::VoiceChat | Self::TextChat)
    }

    /// Phrase spoken when the screen opens
    #[must_use]
    pub const fn announcement(self) -> &'static str {
        match self {
            Self::Welcome => "Home page opened",
            Self::Profile => "Settings opened",
            Self::VoiceChat => "Voice chat opened",
            Self::TextChat => "Text chat opened",
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Screen {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "welcome" | "home" => Ok(Self::Welcome),
            "profile" | "settings" => Ok(Self::Profile),
            "voice-chat" | "voice" => Ok(Self::VoiceChat),
            "text-chat" | "text" => Ok(Self::TextChat),
            other => Err(Error::Config(format!("unknown screen: {other}"))),
        }
    }
}

/// Navigation targets handed to the navigate callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Settings,
    VoiceChat,
    TextChat,
}

impl Route {
    /// Router path for this route
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/welcome",
            Self::Settings => "/profile",
            Self::VoiceChat => "/chat?mode=voice",
            Self::TextChat => "/chat?mode=text",
        }
    }

    /// Screen this route lands on
    #[must_use]
    pub const fn screen(self) -> Screen {
        match self {
            Self::Home => Screen::Welcome,
            Self::Settings => Screen::Profile,
            Self::VoiceChat => Screen::VoiceChat,
            Self::TextChat => Screen::TextChat,
        }
    }
}

/// An executable voice command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Navigate(Route),
    /// Begin dictating a chat message (voice chat only)
    StartInput,
    Logout,
    ShowHelp,
}

/// Result of interpreting a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    Command(Command),
    /// Nothing but the wake word was said
    WakeWordOnly,
    Unrecognized,
}

/// Classifies transcripts against the command table
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    detector: WakeWordDetector,
    patterns: RegexSet,
}

impl CommandInterpreter {
    /// Build the pattern table for a single wake word
    ///
    /// # Errors
    ///
    /// Returns error if the wake word is empty
    pub fn new(wake_word: &str) -> Result<Self> {
        Self::with_detector(WakeWordDetector::new(vec![wake_word.to_string()])?)
    }

    /// Build the pattern table around an existing detector
    ///
    /// # Errors
    ///
    /// Returns error if a pattern fails to compile
    pub fn with_detector(detector: WakeWordDetector) -> Result<Self> {
        let prefix = detector.pattern_prefix();
        let bodies = [
            r"(home\s*page\s*open|open\s*home\s*page|open\s*home|home\s*open)",
            r"(setting\s*page\s*open|open\s*setting\s*page|open\s*setting|setting\s*open)",
            r"(voice\s*page\s*open|open\s*voice\s*page|open\s*voice|voice\s*open)",
            r"(text\s*page\s*open|open\s*text\s*page|open\s*text|text\s*open)",
            r"(start\s*input|record)",
            r"(logout|show\s*help|guide\s*me)",
        ];

        let patterns = RegexSet::new(bodies.iter().map(|body| format!("{prefix}{body}")))
            .map_err(|e| Error::Config(format!("invalid command pattern: {e}")))?;

        Ok(Self { detector, patterns })
    }

    /// The wake word detector backing this interpreter
    #[must_use]
    pub const fn detector(&self) -> &WakeWordDetector {
        &self.detector
    }

    /// Whether the transcript mentions a wake word
    #[must_use]
    pub fn contains_wake_word(&self, command: &str) -> bool {
        self.detector.detect(command)
    }

    /// Whether the transcript matches a known command pattern
    #[must_use]
    pub fn is_valid_command(&self, command: &str) -> bool {
        self.patterns.is_match(command)
    }

    /// Whether the transcript should skip the debounce and run now
    #[must_use]
    pub fn is_immediate(&self, command: &str) -> bool {
        has_trigger_keyword(command) && self.is_valid_command(command)
    }

    /// Interpret a normalized transcript on a given screen
    #[must_use]
    pub fn interpret(&self, command: &str, screen: Screen) -> Interpretation {
        let actual = self.detector.strip(command);
        if actual.is_empty() {
            return Interpretation::WakeWordOnly;
        }

        parse_command(actual, screen).map_or(Interpretation::Unrecognized, Interpretation::Command)
    }
}

/// Lower-case and trim a raw transcript
#[must_use]
pub fn normalize(transcript: &str) -> String {
    transcript.trim().to_lowercase()
}

/// Whether any trigger keyword occurs in the transcript
#[must_use]
pub fn has_trigger_keyword(command: &str) -> bool {
    TRIGGER_KEYWORDS.iter().any(|k| command.contains(k))
}

/// Map a command (wake word already removed) to an action
///
/// Word order is free: "open voice" and "voice page open" both navigate.
fn parse_command(actual: &str, screen: Screen) -> Option<Command> {
    let has = |word: &str| actual.contains(word);

    if has("open") {
        let route = if has("voice") {
            Some(Route::VoiceChat)
        } else if has("text") {
            Some(Route::TextChat)
        } else if has("setting") {
            Some(Route::Settings)
        } else if has("home") {
            Some(Route::Home)
        } else {
            None
        };

        if let Some(route) = route {
            return Some(Command::Navigate(route));
        }
    }

    if has("logout") || has("sign out") {
        return Some(Command::Logout);
    }

    if has("show help") || has("guide me") {
        return Some(Command::ShowHelp);
    }

    if screen == Screen::VoiceChat && has("start") && has("input") {
        return Some(Command::StartInput);
    }

    None
}

/// Spoken list of commands valid on a screen
#[must_use]
pub fn help_text(screen: Screen) -> String {
    let mut text = String::from(
        "Available voice commands: Say \"Open home\". Say \"Open setting\". \
         Say \"Open voice\". Say \"Open text\". ",
    );

    if screen == Screen::VoiceChat {
        text.push_str("Say \"start input\". ");
    }

    text.push_str("Say \"show help\" or \"guide me\" to hear these commands again.");
    text
}

/// Spoken when a dispatched command cannot be mapped to an action
#[must_use]
pub const fn not_understood() -> &'static str {
    NOT_UNDERSTOOD
}
