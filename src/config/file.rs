//! TOML configuration file loading
//!
//! Supports `~/.config/ability/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AbilityConfigFile {
    /// Speech recognition and synthesis settings
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Timer overrides, all in milliseconds
    #[serde(default)]
    pub timing: TimingFileConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageFileConfig,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Wake word (e.g. "ability")
    pub wake_word: Option<String>,

    /// Recognition and synthesis language tag (e.g. "en-US")
    pub language: Option<String>,

    /// Language tag for assistant replies
    pub reply_language: Option<String>,

    /// Synthesis pitch multiplier
    pub pitch: Option<f32>,

    /// Synthesis rate multiplier
    pub rate: Option<f32>,

    /// Context words passed to the recognizer as hints
    pub context_hints: Option<Vec<String>>,
}

/// Timer overrides in milliseconds
#[derive(Debug, Default, Deserialize)]
pub struct TimingFileConfig {
    pub wake_window_ms: Option<u64>,
    pub interim_debounce_ms: Option<u64>,
    pub duplicate_cooldown_ms: Option<u64>,
    pub error_cooldown_ms: Option<u64>,
    pub dictation_silence_ms: Option<u64>,
    pub command_settle_ms: Option<u64>,
    pub command_cooldown_ms: Option<u64>,
    pub watchdog_interval_ms: Option<u64>,
    pub dictation_prompt_delay_ms: Option<u64>,
    pub reply_resume_delay_ms: Option<u64>,
    pub empty_dictation_restart_ms: Option<u64>,
    pub retry_delay_ms: Option<u64>,
    pub aborted_retry_delay_ms: Option<u64>,
    pub network_retry_delay_ms: Option<u64>,
    pub mount_start_delay_ms: Option<u64>,
    pub chat_mount_start_delay_ms: Option<u64>,
    pub toggle_start_delay_ms: Option<u64>,
    pub announce_delay_ms: Option<u64>,
    pub chat_announce_delay_ms: Option<u64>,
}

/// Storage configuration
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Directory holding the persisted preference file
    pub data_dir: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AbilityConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AbilityConfigFile {
    let Some(path) = config_file_path() else {
        return AbilityConfigFile::default();
    };

    if !path.exists() {
        return AbilityConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config_file(&content).unwrap_or_else(|e| {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config file, using defaults"
            );
            AbilityConfigFile::default()
        }),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AbilityConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the content is not valid TOML for this schema
pub fn parse_config_file(content: &str) -> crate::Result<AbilityConfigFile> {
    let config = toml::from_str(content)?;
    tracing::info!("loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/ability/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("ability").join("config.toml"))
}
