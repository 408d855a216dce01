pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod paths;
pub mod playback;
pub mod queue;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod time;
pub mod transition;
pub mod verse;

pub use config::{ContentConfig, LectioConfig, LoggingConfig, PlaybackConfig};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use controller::PlaybackController;
pub use engine::{AudioEngine, EngineError, LoadGeneration};
pub use error::CoreError;
pub use paths::{
    config_dir, config_path, log_path, verse_db_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    LOG_FILE_NAME, VERSE_DB_FILE_NAME,
};
pub use playback::PlaybackState;
pub use queue::{ItemKind, Queue, QueueItem, Removed, TrackId};
pub use service::{PlayerCommand, PlayerHandle, PlayerService};
pub use snapshot::{PlaybackError, PlaybackSnapshot, SnapshotPublisher};
pub use store::{MemoryVerseStore, SqliteVerseStore, VerseSource};
pub use time::{format_position, DurationExt};
pub use transition::{DisplayMode, ModeTransition, TransitionState};
pub use verse::{resolve, VerseSpan, VerseTimeline};
