//! Boundary to the external audio decoding/output engine.

use crate::queue::QueueItem;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Monotonically increasing counter identifying one `load` request.
///
/// Every engine callback carries the generation of the load it belongs to so
/// that completions and ticks from superseded loads can be discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadGeneration(u64);

impl LoadGeneration {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for LoadGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immediate rejection of an engine command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct EngineError {
    pub reason: String,
}

impl EngineError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Commands issued to the audio engine.
///
/// Calls are fire-and-forget: implementations must not block. An `Err` means
/// the engine rejected the command outright; failures discovered later are
/// reported back through the controller's `on_load_complete` and
/// `on_engine_error` callbacks, tagged with the load generation.
pub trait AudioEngine: Send {
    /// Start loading `item`; completion is acknowledged asynchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the load.
    fn load(&mut self, item: &QueueItem, generation: LoadGeneration) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// Returns an error if the engine cannot start playback.
    fn play(&mut self) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// Returns an error if the engine cannot pause.
    fn pause(&mut self) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// Returns an error if the engine rejects the seek.
    fn seek(&mut self, position_ms: u64) -> Result<(), EngineError>;
}
