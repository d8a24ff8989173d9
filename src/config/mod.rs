//! Configuration management for the voice navigation engine

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;

/// Default wake word
pub const DEFAULT_WAKE_WORD: &str = "ability";

/// Voice navigation configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Speech settings
    pub voice: VoiceConfig,

    /// Timer settings
    pub timing: TimingConfig,

    /// Directory for persisted state (`~/.local/share/ability` on Linux)
    pub data_dir: PathBuf,
}

/// Speech recognition and synthesis settings
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Word that arms the command window
    pub wake_word: String,

    /// Recognition and prompt language (e.g. "en-US")
    pub language: String,

    /// Language used for assistant replies
    pub reply_language: String,

    /// Synthesis pitch multiplier
    pub pitch: f32,

    /// Synthesis rate multiplier
    pub rate: f32,

    /// Context words passed to the recognizer in command mode
    pub context_hints: Vec<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            language: "en-US".to_string(),
            reply_language: "en".to_string(),
            pitch: 1.0,
            rate: 0.8,
            context_hints: ["ability", "open", "voice", "chat", "start", "recording"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Every timer the engine arms
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// How long a heard wake word keeps the command window open
    pub wake_window: Duration,
    /// Quiet period before a buffered interim transcript is executed
    pub interim_debounce: Duration,
    /// Window in which an identical transcript is not executed again
    pub duplicate_cooldown: Duration,
    /// Minimum gap between spoken "not understood" notices
    pub error_cooldown: Duration,
    /// Silence after which dictated text is sent
    pub dictation_silence: Duration,
    /// Pause between stopping the recognizer and running a command
    pub command_settle: Duration,
    /// Pause after a command before listening resumes
    pub command_cooldown: Duration,
    /// Interval of the recognizer watchdog
    pub watchdog_interval: Duration,
    /// Delay between the "Speak" prompt and dictation capture
    pub dictation_prompt_delay: Duration,
    /// Delay between an assistant reply ending and listening resuming
    pub reply_resume_delay: Duration,
    /// Delay before command listening resumes after an empty dictation
    pub empty_dictation_restart: Duration,
    /// Retry delay after an unclassified recognizer failure
    pub retry_delay: Duration,
    /// Retry delay after an aborted recognition session
    pub aborted_retry_delay: Duration,
    /// Retry delay after a recognizer network failure
    pub network_retry_delay: Duration,
    /// Delay before listening starts after a screen mounts
    pub mount_start_delay: Duration,
    /// Delay before listening starts after a chat screen mounts
    pub chat_mount_start_delay: Duration,
    /// Delay before listening starts after the user turns voice on
    pub toggle_start_delay: Duration,
    /// Delay before a page announcement
    pub announce_delay: Duration,
    /// Delay before a chat page announcement
    pub chat_announce_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wake_window: Duration::from_secs(5),
            interim_debounce: Duration::from_secs(1),
            duplicate_cooldown: Duration::from_secs(2),
            error_cooldown: Duration::from_secs(3),
            dictation_silence: Duration::from_secs(2),
            command_settle: Duration::from_millis(500),
            command_cooldown: Duration::from_secs(2),
            watchdog_interval: Duration::from_secs(5),
            dictation_prompt_delay: Duration::from_millis(1500),
            reply_resume_delay: Duration::from_millis(500),
            empty_dictation_restart: Duration::from_secs(1),
            retry_delay: Duration::from_secs(3),
            aborted_retry_delay: Duration::from_secs(2),
            network_retry_delay: Duration::from_secs(5),
            mount_start_delay: Duration::from_millis(1500),
            chat_mount_start_delay: Duration::from_millis(2500),
            toggle_start_delay: Duration::from_secs(1),
            announce_delay: Duration::from_millis(500),
            chat_announce_delay: Duration::from_secs(2),
        }
    }
}

impl TimingConfig {
    /// Apply millisecond overrides from the config file
    fn overlay(mut self, fc: &file::TimingFileConfig) -> Self {
        let set = |slot: &mut Duration, ms: Option<u64>| {
            if let Some(ms) = ms {
                *slot = Duration::from_millis(ms);
            }
        };

        set(&mut self.wake_window, fc.wake_window_ms);
        set(&mut self.interim_debounce, fc.interim_debounce_ms);
        set(&mut self.duplicate_cooldown, fc.duplicate_cooldown_ms);
        set(&mut self.error_cooldown, fc.error_cooldown_ms);
        set(&mut self.dictation_silence, fc.dictation_silence_ms);
        set(&mut self.command_settle, fc.command_settle_ms);
        set(&mut self.command_cooldown, fc.command_cooldown_ms);
        set(&mut self.watchdog_interval, fc.watchdog_interval_ms);
        set(&mut self.dictation_prompt_delay, fc.dictation_prompt_delay_ms);
        set(&mut self.reply_resume_delay, fc.reply_resume_delay_ms);
        set(&mut self.empty_dictation_restart, fc.empty_dictation_restart_ms);
        set(&mut self.retry_delay, fc.retry_delay_ms);
        set(&mut self.aborted_retry_delay, fc.aborted_retry_delay_ms);
        set(&mut self.network_retry_delay, fc.network_retry_delay_ms);
        set(&mut self.mount_start_delay, fc.mount_start_delay_ms);
        set(&mut self.chat_mount_start_delay, fc.chat_mount_start_delay_ms);
        set(&mut self.toggle_start_delay, fc.toggle_start_delay_ms);
        set(&mut self.announce_delay, fc.announce_delay_ms);
        set(&mut self.chat_announce_delay, fc.chat_announce_delay_ms);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voice: VoiceConfig::default(),
            timing: TimingConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is malformed
    pub fn load() -> Result<Self> {
        Self::from_file(file::load_config_file())
    }

    /// Build configuration from a parsed config file plus environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is malformed or the wake word is empty
    pub fn from_file(fc: file::AbilityConfigFile) -> Result<Self> {
        let defaults = VoiceConfig::default();

        let rate = match std::env::var("ABILITY_SPEECH_RATE") {
            Ok(raw) => raw.parse::<f32>().map_err(|e| {
                crate::Error::Config(format!("invalid ABILITY_SPEECH_RATE {raw:?}: {e}"))
            })?,
            Err(_) => fc.voice.rate.unwrap_or(defaults.rate),
        };

        let wake_word = std::env::var("ABILITY_WAKE_WORD")
            .ok()
            .or(fc.voice.wake_word)
            .unwrap_or(defaults.wake_word)
            .trim()
            .to_lowercase();

        if wake_word.is_empty() {
            return Err(crate::Error::Config("wake word must not be empty".to_string()));
        }

        let voice = VoiceConfig {
            wake_word,
            language: std::env::var("ABILITY_LANGUAGE")
                .ok()
                .or(fc.voice.language)
                .unwrap_or(defaults.language),
            reply_language: fc.voice.reply_language.unwrap_or(defaults.reply_language),
            pitch: fc.voice.pitch.unwrap_or(defaults.pitch),
            rate,
            context_hints: fc.voice.context_hints.unwrap_or(defaults.context_hints),
        };

        let data_dir = std::env::var("ABILITY_DATA_DIR")
            .ok()
            .or(fc.storage.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        Ok(Self {
            voice,
            timing: TimingConfig::default().overlay(&fc.timing),
            data_dir,
        })
    }
}

/// Default data directory: `~/.local/share/ability` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from(".ability"), |d| d.data_dir().join("ability"))
}
