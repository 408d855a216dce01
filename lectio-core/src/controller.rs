//! Single-writer playback controller.
//!
//! Owns the playback state, the queue, the display mode and the loaded verse
//! timeline. Every event source (UI actions, engine ticks and callbacks,
//! animation completion) is an operation on this type, applied in call order,
//! and each state change is published as a [`PlaybackSnapshot`].

use crate::config::PlaybackConfig;
use crate::engine::{AudioEngine, EngineError, LoadGeneration};
use crate::error::{CoreError, Result};
use crate::playback::PlaybackState;
use crate::queue::{Queue, QueueItem};
use crate::snapshot::{PlaybackError, PlaybackSnapshot, SnapshotPublisher};
use crate::store::VerseSource;
use crate::time::format_position;
use crate::transition::{DisplayMode, ModeTransition, TransitionState};
use crate::verse::VerseTimeline;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lectio::controller";

/// Optimistic seek awaiting confirmation from the engine's ticks
#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    target_ms: u64,
    dropped_ticks: u32,
}

pub struct PlaybackController {
    engine: Box<dyn AudioEngine>,
    verses: Box<dyn VerseSource>,
    config: PlaybackConfig,
    state: PlaybackState,
    queue: Queue,
    transition: ModeTransition,
    timeline: VerseTimeline,
    generation: LoadGeneration,
    load_in_flight: bool,
    pending_seek: Option<PendingSeek>,
    last_error: Option<PlaybackError>,
    publisher: SnapshotPublisher,
}

impl PlaybackController {
    #[must_use]
    pub fn new(
        engine: Box<dyn AudioEngine>,
        verses: Box<dyn VerseSource>,
        config: PlaybackConfig,
    ) -> Self {
        let publisher = SnapshotPublisher::new(config.snapshot_channel_capacity);
        Self {
            engine,
            verses,
            config,
            state: PlaybackState::default(),
            queue: Queue::new(),
            transition: ModeTransition::new(),
            timeline: VerseTimeline::default(),
            generation: LoadGeneration::default(),
            load_in_flight: false,
            pending_seek: None,
            last_error: None,
            publisher,
        }
    }

    /// Subscribe to snapshots published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackSnapshot> {
        self.publisher.subscribe()
    }

    /// Most recently published snapshot
    #[must_use]
    pub const fn snapshot(&self) -> &PlaybackSnapshot {
        self.publisher.latest()
    }

    #[must_use]
    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[must_use]
    pub const fn queue(&self) -> &Queue {
        &self.queue
    }

    #[must_use]
    pub const fn transition_state(&self) -> TransitionState {
        self.transition.state()
    }

    /// Generation of the most recent load
    #[must_use]
    pub const fn generation(&self) -> LoadGeneration {
        self.generation
    }

    /// A load was issued and neither a tick nor a completion has arrived yet
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.load_in_flight
    }

    #[must_use]
    pub const fn timeline(&self) -> &VerseTimeline {
        &self.timeline
    }

    // --- Playback -------------------------------------------------------

    /// Load `item` and start playing it from the beginning.
    ///
    /// Supersedes any load still in flight: callbacks tagged with an older
    /// generation are discarded from here on. The item is played outside the
    /// queue, so the queue cursor is released; queue entries are played
    /// through [`Self::play_queue_index`] and the skip operations.
    pub fn load_and_play(&mut self, item: QueueItem) {
        self.queue.release_cursor();
        self.play_queue_entry(item);
    }

    /// Load the item the queue cursor was just moved to
    fn play_queue_entry(&mut self, item: QueueItem) {
        self.begin_load(item);
        self.publish();
    }

    fn begin_load(&mut self, item: QueueItem) {
        self.generation = self.generation.next();
        let generation = self.generation;

        self.pending_seek = None;
        self.timeline = match self.verses.verse_spans(&item.track_id) {
            Ok(timeline) => timeline,
            Err(CoreError::NotFound { .. }) => {
                debug!(
                    target: LOG_TARGET,
                    track = %item.track_id,
                    "No verse timing, highlighting disabled"
                );
                VerseTimeline::default()
            }
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    track = %item.track_id,
                    "Failed to load verse timing: {e}"
                );
                VerseTimeline::default()
            }
        };

        info!(
            target: LOG_TARGET,
            "Loading {} ({}, {}) generation {}",
            item.label(),
            item.kind.as_str(),
            format_position(item.duration_ms),
            generation
        );

        let result = self
            .engine
            .load(&item, generation)
            .and_then(|()| self.engine.play());

        self.state.start_track(item);
        self.load_in_flight = true;

        match result {
            Ok(()) => self.last_error = None,
            Err(e) => self.fail_load(&e),
        }
    }

    /// Flip between playing and paused. No-op without a loaded track.
    pub fn toggle_play_pause(&mut self) {
        if self.state.current_track.is_none() {
            return;
        }

        let result = if self.state.is_playing {
            self.engine.pause()
        } else {
            self.engine.play()
        };

        match result {
            Ok(()) => {
                self.state.is_playing = !self.state.is_playing;
                self.last_error = None;
                debug!(target: LOG_TARGET, playing = self.state.is_playing, "Play/pause toggled");
            }
            Err(e) => self.record_failure(&e.reason),
        }
        self.publish();
    }

    /// Seek within the loaded track.
    ///
    /// The target is clamped to the track, and the position and active verse
    /// update immediately rather than waiting for the engine's next tick.
    pub fn seek(&mut self, target_ms: u64) {
        if self.state.current_track.is_none() {
            return;
        }

        let target_ms = self
            .state
            .clamp_position(target_ms, self.timeline.duration_ms());
        if let Err(e) = self.engine.seek(target_ms) {
            self.record_failure(&e.reason);
            self.publish();
            return;
        }

        self.pending_seek = Some(PendingSeek {
            target_ms,
            dropped_ticks: 0,
        });
        self.state.set_position(target_ms, &self.timeline);
        self.last_error = None;
        debug!(
            target: LOG_TARGET,
            position = %format_position(target_ms),
            verse = ?self.state.active_verse,
            "Seek"
        );
        self.publish();
    }

    /// Seek to the start of a verse in the loaded track.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the verse is not in the loaded
    /// track's timing table. Nothing changes and nothing is published.
    pub fn on_verse_press(&mut self, verse: u32) -> Result<()> {
        let Some(start_ms) = self.timeline.start_of(verse) else {
            debug!(target: LOG_TARGET, verse, "Pressed verse is not in the loaded track");
            return Err(CoreError::not_found(format!("verse {verse}")));
        };
        self.seek(start_ms);
        Ok(())
    }

    /// Stop playback and unload the track. The queue items are kept; the
    /// cursor is released since nothing is loaded.
    pub fn stop(&mut self) {
        self.halt(true);
        self.last_error = None;
        self.publish();
    }

    // --- Engine callbacks ----------------------------------------------

    /// Periodic position report from the engine.
    ///
    /// Dropped when it belongs to a superseded load, or while a user seek is
    /// waiting for the engine to catch up. Returns `true` if it was applied.
    pub fn on_engine_tick(&mut self, generation: LoadGeneration, position_ms: u64) -> bool {
        if generation != self.generation || self.state.current_track.is_none() {
            debug!(
                target: LOG_TARGET,
                %generation,
                current = %self.generation,
                "Dropped stale tick"
            );
            return false;
        }
        self.load_in_flight = false;

        if let Some(pending) = self.pending_seek.as_mut() {
            if position_ms.abs_diff(pending.target_ms) <= self.config.seek_ack_tolerance_ms {
                self.pending_seek = None;
            } else if pending.dropped_ticks < self.config.seek_suppress_ticks {
                pending.dropped_ticks += 1;
                debug!(
                    target: LOG_TARGET,
                    tick = position_ms,
                    target_ms = pending.target_ms,
                    "Suppressed pre-seek tick"
                );
                return false;
            } else {
                // Window exhausted; the engine's clock is authoritative again
                self.pending_seek = None;
            }
        }

        // Ticks are only bounded by a known duration
        let position_ms = self.state.clamp_position(position_ms, 0);

        // Small backward steps are report jitter; a larger jump back is the
        // engine landing on an earlier seek target
        let behind_ms = self.state.position_ms.saturating_sub(position_ms);
        if self.state.is_playing && (1..=self.config.seek_ack_tolerance_ms).contains(&behind_ms) {
            return false;
        }

        if self.state.set_position(position_ms, &self.timeline) {
            self.publish();
        }
        true
    }

    /// The engine finished playing the track of `generation`.
    pub fn on_track_ended(&mut self, generation: LoadGeneration) {
        if generation != self.generation {
            debug!(target: LOG_TARGET, %generation, "Ignored end of superseded track");
            return;
        }

        // A track played outside the queue does not continue into it
        let next = if self.queue.cursor().is_some() {
            self.queue.advance().cloned()
        } else {
            None
        };

        if let Some(next) = next {
            self.play_queue_entry(next);
        } else {
            info!(target: LOG_TARGET, "Reached end of queue");
            self.halt(false);
            self.publish();
        }
    }

    /// Asynchronous acknowledgement of a `load` command.
    pub fn on_load_complete(
        &mut self,
        generation: LoadGeneration,
        result: std::result::Result<(), EngineError>,
    ) {
        if generation != self.generation {
            debug!(target: LOG_TARGET, %generation, "Discarded completion of superseded load");
            return;
        }

        self.load_in_flight = false;
        match result {
            Ok(()) => debug!(target: LOG_TARGET, %generation, "Load complete"),
            Err(e) => {
                self.fail_load(&e);
                self.publish();
            }
        }
    }

    /// Asynchronous failure reported by the engine for the load of `generation`.
    pub fn on_engine_error(&mut self, generation: LoadGeneration, reason: &str) {
        if generation != self.generation {
            debug!(target: LOG_TARGET, %generation, "Discarded error from superseded load");
            return;
        }

        self.state.is_playing = false;
        self.load_in_flight = false;
        self.pending_seek = None;
        self.record_failure(reason);
        self.publish();
    }

    // --- Queue ----------------------------------------------------------

    /// Insert into the queue (end of queue when `position` is `None`).
    ///
    /// Pure bookkeeping: nothing is loaded.
    pub fn enqueue(&mut self, item: QueueItem, position: Option<usize>) -> usize {
        let index = self.queue.add(item, position);
        self.last_error = None;
        self.publish();
        index
    }

    /// Remove a queue entry.
    ///
    /// Removing the entry that is playing moves on to the next entry, or stops
    /// playback when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an invalid index; nothing changes.
    pub fn dequeue(&mut self, index: usize) -> Result<QueueItem> {
        let removed = self.queue.remove(index)?;
        self.last_error = None;

        if removed.was_current && self.state.current_track.is_some() {
            if let Some(next) = self.queue.current().cloned() {
                self.begin_load(next);
            } else {
                info!(target: LOG_TARGET, "Removed the playing item, stopping");
                self.halt(true);
            }
        }

        self.publish();
        Ok(removed.item)
    }

    /// Move a queue entry. The loaded track is unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if either index is invalid; nothing changes.
    pub fn reorder_queue(&mut self, from: usize, to: usize) -> Result<()> {
        self.queue.reorder(from, to)?;
        self.last_error = None;
        self.publish();
        Ok(())
    }

    /// Play the queue entry at `index` (a tap in the queue view).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] for an invalid index; nothing changes.
    pub fn play_queue_index(&mut self, index: usize) -> Result<()> {
        let item = self.queue.jump_to(index)?.clone();
        self.play_queue_entry(item);
        Ok(())
    }

    /// Play the next queue entry, or the first one when no entry is loaded.
    /// Returns `false` at the end of the queue.
    pub fn skip_next(&mut self) -> bool {
        match self.queue.advance().cloned() {
            Some(next) => {
                self.play_queue_entry(next);
                true
            }
            None => false,
        }
    }

    /// Play the previous queue entry, or restart the current one at the start
    /// of the queue.
    pub fn skip_previous(&mut self) {
        if let Some(prev) = self.queue.retreat().cloned() {
            self.play_queue_entry(prev);
        } else {
            self.seek(0);
        }
    }

    /// Empty the queue and stop playback
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.halt(true);
        self.last_error = None;
        self.publish();
    }

    // --- Display mode ---------------------------------------------------

    /// Ask the UI to switch between the text and queue views
    pub fn request_mode(&mut self, target: DisplayMode) {
        if self.transition.request_switch(target) {
            self.publish();
        }
    }

    /// The UI finished animating the current transition
    pub fn complete_transition(&mut self) {
        if self.transition.complete_transition() {
            self.publish();
        }
    }

    // --- Internals ------------------------------------------------------

    /// Return to idle and release the queue cursor. Bumps the generation so
    /// late callbacks from the old load are treated as stale.
    fn halt(&mut self, pause_engine: bool) {
        if pause_engine && self.state.is_playing {
            if let Err(e) = self.engine.pause() {
                warn!(target: LOG_TARGET, "Engine refused to pause while stopping: {e}");
            }
        }

        self.generation = self.generation.next();
        self.queue.release_cursor();
        self.state.stop();
        self.timeline = VerseTimeline::default();
        self.load_in_flight = false;
        self.pending_seek = None;
    }

    fn fail_load(&mut self, error: &EngineError) {
        self.state.is_playing = false;
        self.load_in_flight = false;
        self.record_failure(&error.reason);
    }

    fn record_failure(&mut self, reason: &str) {
        warn!(target: LOG_TARGET, "Audio engine failure: {reason}");
        self.last_error = Some(PlaybackError {
            reason: reason.to_string(),
        });
    }

    fn publish(&mut self) {
        self.publisher.publish(
            &self.state,
            &self.queue,
            self.transition.state(),
            self.last_error.as_ref(),
        );
    }
}
