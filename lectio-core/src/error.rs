use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Playback errors
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Index {index} out of range (length {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("Audio engine failure: {reason}")]
    EngineFailure { reason: String },

    #[error("Invalid verse timeline: {reason}")]
    InvalidTimeline { reason: String },

    #[error("Player service is no longer running")]
    ServiceClosed,

    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please review it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Content store errors
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
