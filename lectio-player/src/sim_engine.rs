//! Simulated audio engine: a clock task that plays silence at the configured
//! tick cadence and reports back through a [`PlayerHandle`].

use lectio_core::{
    AudioEngine, DurationExt, EngineError, LoadGeneration, PlayerCommand, PlayerHandle, QueueItem,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOG_TARGET: &str = "lectio::sim_engine";

#[derive(Debug)]
enum ClockCommand {
    Load {
        generation: LoadGeneration,
        duration_ms: u64,
    },
    Play,
    Pause,
    Seek(u64),
}

/// [`AudioEngine`] that forwards commands to the clock task
pub struct SimulatedEngine {
    tx: mpsc::UnboundedSender<ClockCommand>,
}

impl SimulatedEngine {
    fn send(&self, command: ClockCommand) -> Result<(), EngineError> {
        self.tx
            .send(command)
            .map_err(|_| EngineError::new("simulated clock is not running"))
    }
}

impl AudioEngine for SimulatedEngine {
    fn load(&mut self, item: &QueueItem, generation: LoadGeneration) -> Result<(), EngineError> {
        self.send(ClockCommand::Load {
            generation,
            duration_ms: item.duration_ms,
        })
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.send(ClockCommand::Play)
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.send(ClockCommand::Pause)
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), EngineError> {
        self.send(ClockCommand::Seek(position_ms))
    }
}

/// Clock state for the loaded track
#[derive(Debug, Default)]
struct Clock {
    generation: LoadGeneration,
    duration_ms: u64,
    position_ms: u64,
    playing: bool,
    loaded: bool,
}

enum TickOutcome {
    Idle,
    Position(LoadGeneration, u64),
    Ended(LoadGeneration),
}

impl Clock {
    fn apply(&mut self, command: ClockCommand) -> Option<LoadGeneration> {
        match command {
            ClockCommand::Load {
                generation,
                duration_ms,
            } => {
                *self = Self {
                    generation,
                    duration_ms,
                    loaded: true,
                    ..Self::default()
                };
                return Some(generation);
            }
            ClockCommand::Play => self.playing = self.loaded,
            ClockCommand::Pause => self.playing = false,
            ClockCommand::Seek(position_ms) => self.position_ms = position_ms.min(self.duration_ms),
        }
        None
    }

    fn advance(&mut self, elapsed_ms: u64) -> TickOutcome {
        if !self.playing {
            return TickOutcome::Idle;
        }

        self.position_ms = self.position_ms.saturating_add(elapsed_ms);
        if self.position_ms >= self.duration_ms {
            self.position_ms = self.duration_ms;
            self.playing = false;
            self.loaded = false;
            return TickOutcome::Ended(self.generation);
        }
        TickOutcome::Position(self.generation, self.position_ms)
    }
}

/// Create the engine together with the clock that will drive it.
///
/// The clock is started separately because it reports to a [`PlayerHandle`],
/// which only exists once the engine has been handed to the controller.
#[must_use]
pub fn channel() -> (SimulatedEngine, SimulatedClock) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SimulatedEngine { tx }, SimulatedClock { rx })
}

/// Receiving half of the simulated engine
pub struct SimulatedClock {
    rx: mpsc::UnboundedReceiver<ClockCommand>,
}

impl SimulatedClock {
    /// Start ticking. `speed` multiplies simulated time per real tick. The task
    /// runs until `cancel_token` fires, the engine is dropped, or the player
    /// service stops.
    #[must_use]
    pub fn start(
        self,
        player: PlayerHandle,
        tick_interval: Duration,
        speed: u32,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(run_clock(self.rx, player, tick_interval, speed, cancel_token))
    }
}

async fn run_clock(
    mut rx: mpsc::UnboundedReceiver<ClockCommand>,
    player: PlayerHandle,
    tick_interval: Duration,
    speed: u32,
    cancel_token: CancellationToken,
) {
    info!(target: LOG_TARGET, "Simulated clock started ({:?} ticks, {}x)", tick_interval, speed);

    let step_ms = tick_interval.as_millis_u64().saturating_mul(u64::from(speed.max(1)));
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut clock = Clock::default();

    loop {
        let sent = tokio::select! {
            () = cancel_token.cancelled() => break,
            command = rx.recv() => {
                let Some(command) = command else { break };
                debug!(target: LOG_TARGET, ?command, "Engine command");
                match clock.apply(command) {
                    Some(generation) => player.send(PlayerCommand::LoadComplete {
                        generation,
                        result: Ok(()),
                    }),
                    None => Ok(()),
                }
            }
            _ = interval.tick() => match clock.advance(step_ms) {
                TickOutcome::Idle => Ok(()),
                TickOutcome::Position(generation, position_ms) => {
                    player.engine_tick(generation, position_ms)
                }
                TickOutcome::Ended(generation) => player.track_ended(generation),
            },
        };

        if sent.is_err() {
            debug!(target: LOG_TARGET, "Player service gone, stopping clock");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_clock(duration_ms: u64) -> Clock {
        let mut clock = Clock::default();
        clock.apply(ClockCommand::Load {
            generation: LoadGeneration::new(3),
            duration_ms,
        });
        clock.apply(ClockCommand::Play);
        clock
    }

    #[test]
    fn test_clock_reports_position() {
        let mut clock = loaded_clock(1000);
        assert!(matches!(clock.advance(250), TickOutcome::Position(g, 250) if g.value() == 3));
        assert!(matches!(clock.advance(250), TickOutcome::Position(_, 500)));
    }

    #[test]
    fn test_clock_ends_track() {
        let mut clock = loaded_clock(600);
        clock.advance(500);
        assert!(matches!(clock.advance(500), TickOutcome::Ended(_)));
        assert!(matches!(clock.advance(500), TickOutcome::Idle));
    }

    #[test]
    fn test_clock_pause_and_seek() {
        let mut clock = loaded_clock(10_000);
        clock.apply(ClockCommand::Pause);
        assert!(matches!(clock.advance(250), TickOutcome::Idle));

        clock.apply(ClockCommand::Seek(4000));
        clock.apply(ClockCommand::Play);
        assert!(matches!(clock.advance(250), TickOutcome::Position(_, 4250)));
    }

    #[test]
    fn test_play_before_load_is_ignored() {
        let mut clock = Clock::default();
        clock.apply(ClockCommand::Play);
        assert!(matches!(clock.advance(250), TickOutcome::Idle));
    }
}
