//! Path constants for configuration and content files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "lectio";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the verse timing database file
pub const VERSE_DB_FILE_NAME: &str = "verses.db";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "lectio.log";

/// Get the configuration directory path (~/.config/lectio/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/lectio/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the default verse database path (`~/.config/lectio/verses.db`)
#[must_use]
pub fn verse_db_path() -> PathBuf {
    config_dir().join(VERSE_DB_FILE_NAME)
}

/// Get the log file path (`~/.config/lectio/lectio.log`)
#[must_use]
pub fn log_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}
