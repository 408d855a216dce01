//! Async front-end that serializes every event source onto one task.
//!
//! The [`PlaybackController`] is synchronous and single-writer. `PlayerService`
//! owns it inside a tokio task and applies [`PlayerCommand`]s in arrival
//! order; UI code and engine callbacks talk to it through cloneable
//! [`PlayerHandle`]s.

use crate::controller::PlaybackController;
use crate::engine::{EngineError, LoadGeneration};
use crate::error::{CoreError, Result};
use crate::queue::QueueItem;
use crate::snapshot::PlaybackSnapshot;
use crate::transition::DisplayMode;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOG_TARGET: &str = "lectio::service";

/// Operations accepted by the player task
#[derive(Debug)]
pub enum PlayerCommand {
    // User actions
    LoadAndPlay(QueueItem),
    TogglePlayPause,
    Seek(u64),
    VersePress(u32),
    Stop,
    Enqueue {
        item: QueueItem,
        position: Option<usize>,
    },
    Dequeue(usize),
    ReorderQueue {
        from: usize,
        to: usize,
    },
    PlayQueueIndex(usize),
    SkipNext,
    SkipPrevious,
    ClearQueue,
    RequestMode(DisplayMode),
    CompleteTransition,
    // Engine callbacks
    EngineTick {
        generation: LoadGeneration,
        position_ms: u64,
    },
    TrackEnded(LoadGeneration),
    LoadComplete {
        generation: LoadGeneration,
        result: std::result::Result<(), EngineError>,
    },
    EngineError {
        generation: LoadGeneration,
        reason: String,
    },
    // Queries
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
}

/// Cloneable handle for sending commands to a running [`PlayerService`]
#[derive(Debug)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
    snapshots: broadcast::Receiver<PlaybackSnapshot>,
}

impl Clone for PlayerHandle {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            snapshots: self.snapshots.resubscribe(),
        }
    }
}

impl PlayerHandle {
    /// Subscribe to snapshots published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackSnapshot> {
        self.snapshots.resubscribe()
    }

    /// Queue a command for the player task.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| CoreError::ServiceClosed)
    }

    /// Fetch the latest snapshot after all previously sent commands applied.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Snapshot(tx))?;
        rx.await.map_err(|_| CoreError::ServiceClosed)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn load_and_play(&self, item: QueueItem) -> Result<()> {
        self.send(PlayerCommand::LoadAndPlay(item))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlayPause)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn seek(&self, position_ms: u64) -> Result<()> {
        self.send(PlayerCommand::Seek(position_ms))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn verse_press(&self, verse: u32) -> Result<()> {
        self.send(PlayerCommand::VersePress(verse))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn enqueue(&self, item: QueueItem, position: Option<usize>) -> Result<()> {
        self.send(PlayerCommand::Enqueue { item, position })
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn dequeue(&self, index: usize) -> Result<()> {
        self.send(PlayerCommand::Dequeue(index))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn reorder_queue(&self, from: usize, to: usize) -> Result<()> {
        self.send(PlayerCommand::ReorderQueue { from, to })
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn play_queue_index(&self, index: usize) -> Result<()> {
        self.send(PlayerCommand::PlayQueueIndex(index))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn request_mode(&self, mode: DisplayMode) -> Result<()> {
        self.send(PlayerCommand::RequestMode(mode))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn complete_transition(&self) -> Result<()> {
        self.send(PlayerCommand::CompleteTransition)
    }

    /// Engine position callback
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn engine_tick(&self, generation: LoadGeneration, position_ms: u64) -> Result<()> {
        self.send(PlayerCommand::EngineTick {
            generation,
            position_ms,
        })
    }

    /// Engine end-of-track callback
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the player task has stopped.
    pub fn track_ended(&self, generation: LoadGeneration) -> Result<()> {
        self.send(PlayerCommand::TrackEnded(generation))
    }
}

/// Owns the controller and applies commands one at a time
pub struct PlayerService {
    controller: PlaybackController,
    rx: mpsc::UnboundedReceiver<PlayerCommand>,
    cancel_token: CancellationToken,
}

impl PlayerService {
    /// Wrap a controller.
    ///
    /// # Arguments
    /// * `controller` - Controller to drive
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    #[must_use]
    pub fn new(
        controller: PlaybackController,
        cancel_token: Option<CancellationToken>,
    ) -> (Self, PlayerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = PlayerHandle {
            tx,
            snapshots: controller.subscribe(),
        };
        let service = Self {
            controller,
            rx,
            cancel_token: cancel_token.unwrap_or_default(),
        };
        (service, handle)
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start the player loop in a background task
    #[must_use]
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until cancelled or every handle has been dropped
    pub async fn run(mut self) {
        info!(target: LOG_TARGET, "Player service started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Player service shutting down");
                    break;
                }
                command = self.rx.recv() => {
                    match command {
                        Some(command) => self.apply(command),
                        None => {
                            info!(target: LOG_TARGET, "All player handles dropped");
                            break;
                        }
                    }
                }
            }
        }
    }

    fn apply(&mut self, command: PlayerCommand) {
        let controller = &mut self.controller;
        let outcome = match command {
            PlayerCommand::LoadAndPlay(item) => {
                controller.load_and_play(item);
                Ok(())
            }
            PlayerCommand::TogglePlayPause => {
                controller.toggle_play_pause();
                Ok(())
            }
            PlayerCommand::Seek(position_ms) => {
                controller.seek(position_ms);
                Ok(())
            }
            PlayerCommand::VersePress(verse) => controller.on_verse_press(verse),
            PlayerCommand::Stop => {
                controller.stop();
                Ok(())
            }
            PlayerCommand::Enqueue { item, position } => {
                controller.enqueue(item, position);
                Ok(())
            }
            PlayerCommand::Dequeue(index) => controller.dequeue(index).map(|_| ()),
            PlayerCommand::ReorderQueue { from, to } => controller.reorder_queue(from, to),
            PlayerCommand::PlayQueueIndex(index) => controller.play_queue_index(index),
            PlayerCommand::SkipNext => {
                controller.skip_next();
                Ok(())
            }
            PlayerCommand::SkipPrevious => {
                controller.skip_previous();
                Ok(())
            }
            PlayerCommand::ClearQueue => {
                controller.clear_queue();
                Ok(())
            }
            PlayerCommand::RequestMode(mode) => {
                controller.request_mode(mode);
                Ok(())
            }
            PlayerCommand::CompleteTransition => {
                controller.complete_transition();
                Ok(())
            }
            PlayerCommand::EngineTick {
                generation,
                position_ms,
            } => {
                controller.on_engine_tick(generation, position_ms);
                Ok(())
            }
            PlayerCommand::TrackEnded(generation) => {
                controller.on_track_ended(generation);
                Ok(())
            }
            PlayerCommand::LoadComplete { generation, result } => {
                controller.on_load_complete(generation, result);
                Ok(())
            }
            PlayerCommand::EngineError { generation, reason } => {
                controller.on_engine_error(generation, &reason);
                Ok(())
            }
            PlayerCommand::Snapshot(reply) => {
                // The requester may have given up waiting
                let _ = reply.send(controller.snapshot().clone());
                Ok(())
            }
        };

        if let Err(e) = outcome {
            debug!(target: LOG_TARGET, "Command rejected: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackConfig;
    use crate::engine::AudioEngine;
    use crate::queue::ItemKind;
    use crate::store::MemoryVerseStore;
    use crate::transition::TransitionState;
    use crate::verse::{VerseSpan, VerseTimeline};

    struct SilentEngine;

    impl AudioEngine for SilentEngine {
        fn load(
            &mut self,
            _item: &QueueItem,
            _generation: LoadGeneration,
        ) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        fn play(&mut self) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        fn pause(&mut self) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        fn seek(&mut self, _position_ms: u64) -> std::result::Result<(), EngineError> {
            Ok(())
        }
    }

    fn spawn() -> (PlayerHandle, CancellationToken, tokio::task::JoinHandle<()>) {
        let timeline = VerseTimeline::new(vec![
            VerseSpan::new(1, 0, 5000),
            VerseSpan::new(2, 5000, 12000),
            VerseSpan::new(3, 12000, 20000),
        ])
        .unwrap();
        let controller = PlaybackController::new(
            Box::new(SilentEngine),
            Box::new(MemoryVerseStore::new().with("jhn.1", timeline)),
            PlaybackConfig::default(),
        );
        let (service, handle) = PlayerService::new(controller, None);
        let token = service.cancel_token();
        (handle, token, service.start())
    }

    fn item(id: &str) -> QueueItem {
        QueueItem::new(id, ItemKind::Chapter, 20000)
    }

    #[tokio::test]
    async fn test_commands_apply_in_order() {
        let (handle, token, task) = spawn();

        handle.enqueue(item("jhn.1"), None).unwrap();
        handle.enqueue(item("jhn.2"), None).unwrap();
        handle.play_queue_index(0).unwrap();
        handle.verse_press(2).unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.queue.len(), 2);
        assert_eq!(snapshot.cursor, Some(0));
        assert_eq!(snapshot.position_ms, 5000);
        assert_eq!(snapshot.active_verse, Some(2));
        assert!(snapshot.is_playing);

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_engine_callbacks_through_handle() {
        let (handle, token, task) = spawn();
        handle.enqueue(item("jhn.1"), None).unwrap();
        handle.enqueue(item("jhn.2"), None).unwrap();
        handle.play_queue_index(0).unwrap();

        let generation = LoadGeneration::new(1);
        handle.engine_tick(generation, 13000).unwrap();
        assert_eq!(handle.snapshot().await.unwrap().active_verse, Some(3));

        handle.track_ended(generation).unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.cursor, Some(1));
        assert_eq!(snapshot.position_ms, 0);
        assert_eq!(snapshot.active_verse, None);

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribers_receive_snapshots() {
        let (handle, token, task) = spawn();
        let mut rx = handle.subscribe();

        handle.request_mode(DisplayMode::Queue).unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.transition_state, TransitionState::TransitioningToQueue);

        handle.complete_transition().unwrap();
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.transition_state, TransitionState::QueueMode);

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_command_keeps_service_running() {
        let (handle, token, task) = spawn();
        handle.dequeue(7).unwrap();
        handle.send(PlayerCommand::ReorderQueue { from: 0, to: 1 }).unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.queue.is_empty());

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_closes_service() {
        let (handle, token, task) = spawn();
        token.cancel();
        task.await.unwrap();

        assert!(matches!(handle.toggle_play_pause(), Err(CoreError::ServiceClosed)));
        assert!(matches!(handle.snapshot().await, Err(CoreError::ServiceClosed)));
    }
}
