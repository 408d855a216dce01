//! Immutable state snapshots and their broadcast to observers.

use crate::playback::PlaybackState;
use crate::queue::{Queue, QueueItem};
use crate::transition::TransitionState;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

const LOG_TARGET: &str = "lectio::snapshot";

/// Engine failure surfaced to the UI; cleared by the next successful operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackError {
    pub reason: String,
}

/// Point-in-time copy of everything the UI renders.
///
/// Snapshots own their data; holding one never borrows live controller state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    /// Incremented on every publish
    pub version: u64,
    pub current_track: Option<QueueItem>,
    pub position_ms: u64,
    pub is_playing: bool,
    pub active_verse: Option<u32>,
    pub queue: Vec<QueueItem>,
    pub cursor: Option<usize>,
    pub transition_state: TransitionState,
    pub last_error: Option<PlaybackError>,
}

/// Fan-out of snapshots to any number of observers.
///
/// Sending never blocks: observers that fall behind lose the oldest snapshots
/// and see `RecvError::Lagged`.
pub struct SnapshotPublisher {
    tx: broadcast::Sender<PlaybackSnapshot>,
    latest: PlaybackSnapshot,
}

impl SnapshotPublisher {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            latest: PlaybackSnapshot::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackSnapshot> {
        self.tx.subscribe()
    }

    /// Most recently published snapshot
    #[must_use]
    pub const fn latest(&self) -> &PlaybackSnapshot {
        &self.latest
    }

    /// Capture the given state and send it to every observer
    pub fn publish(
        &mut self,
        state: &PlaybackState,
        queue: &Queue,
        transition_state: TransitionState,
        last_error: Option<&PlaybackError>,
    ) -> &PlaybackSnapshot {
        self.latest = PlaybackSnapshot {
            version: self.latest.version + 1,
            current_track: state.current_track.clone(),
            position_ms: state.position_ms,
            is_playing: state.is_playing,
            active_verse: state.active_verse,
            queue: queue.items().to_vec(),
            cursor: queue.cursor(),
            transition_state,
            last_error: last_error.cloned(),
        };

        // No receivers is fine; the UI may not be attached yet
        let receivers = self.tx.send(self.latest.clone()).unwrap_or(0);
        trace!(target: LOG_TARGET, version = self.latest.version, receivers, "Snapshot published");

        &self.latest
    }
}
