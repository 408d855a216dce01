use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LectioConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Engine ticks ignored after a seek before the engine's clock is trusted again
    #[serde(default = "default_seek_suppress_ticks")]
    pub seek_suppress_ticks: u32,
    /// A tick this close to the seek target confirms the seek
    #[serde(default = "default_seek_ack_tolerance")]
    pub seek_ack_tolerance_ms: u64,
    /// Position callback cadence of the audio engine
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_snapshot_capacity")]
    pub snapshot_channel_capacity: usize,
}

const fn default_seek_suppress_ticks() -> u32 {
    1
}

const fn default_seek_ack_tolerance() -> u64 {
    250
}

const fn default_tick_interval() -> u64 {
    250
}

const fn default_snapshot_capacity() -> usize {
    64
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            seek_suppress_ticks: default_seek_suppress_ticks(),
            seek_ack_tolerance_ms: default_seek_ack_tolerance(),
            tick_interval_ms: default_tick_interval(),
            snapshot_channel_capacity: default_snapshot_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Verse timing database; defaults to `~/.config/lectio/verses.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl ContentConfig {
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::paths::verse_db_path)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/lectio/lectio.log`
    #[serde(default)]
    pub file_enabled: bool,
}

impl LectioConfig {
    /// Get the configuration directory path (~/.config/lectio/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lectio/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from `path` (default location when `None`), writing the
    /// template on first run.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after creating the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map_or_else(Self::config_path, Path::to_path_buf);

        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.playback.tick_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "playback.tick_interval_ms must be greater than 0".to_string(),
            });
        }
        if self.playback.snapshot_channel_capacity == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "playback.snapshot_channel_capacity must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r#"# Lectio Configuration
# ~/.config/lectio/config.toml

[playback]
# Engine position ticks ignored right after a seek, so a stale pre-seek
# position cannot overwrite the new one. Tune to the engine's tick cadence.
seek_suppress_ticks = 1
# A tick within this distance of the seek target confirms the seek
seek_ack_tolerance_ms = 250
# How often the audio engine reports its position
tick_interval_ms = 250
snapshot_channel_capacity = 64

[content]
# Verse timing database (defaults to ~/.config/lectio/verses.db)
# database_path = "/path/to/verses.db"

[logging]
# Also write logs to ~/.config/lectio/lectio.log
file_enabled = false
"#;
