//! Error types for the voice navigation engine

use thiserror::Error;

/// Result type alias for voice navigation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice navigation engine
///
/// None of these cross the navigator's callback boundary: the navigator
/// logs them and turns them into retries or spoken notices.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech recognizer failed to start or stop
    #[error("recognizer error: {0}")]
    Recognizer(String),

    /// Speech synthesizer failed to speak or stop
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Persisted preference could not be read or written
    #[error("preference error: {0}")]
    Preference(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
