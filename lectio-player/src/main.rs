mod cli;
mod import;
mod sim_engine;

use crate::cli::{Cli, Command};
use clap::Parser;
use lectio_core::{
    format_position, CoreError, LectioConfig, PlaybackController, PlaybackSnapshot,
    PlayerService, QueueItem, SqliteVerseStore, TrackId,
};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    init_tracing(check_file_logging_enabled(cli.config.as_deref()));

    let config = match LectioConfig::load_or_create(cli.config.as_deref()) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!("Created config template at {}", path.display());
            LectioConfig::default()
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.content.database_path());
    let mut store = match SqliteVerseStore::open(&db_path) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open verse database: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Import { file } => {
            if let Err(e) = import::import_file(&mut store, &file) {
                error!("{e}");
                std::process::exit(1);
            }
        }
        Command::Play {
            tracks,
            speed,
            json,
        } => {
            let items = match resolve_tracks(&store, &tracks) {
                Ok(items) => items,
                Err(e) => {
                    error!("{e}");
                    std::process::exit(1);
                }
            };

            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create tokio runtime: {e}");
                    std::process::exit(1);
                }
            };

            runtime.block_on(play(config, store, items, speed, json));
        }
    }
}

fn resolve_tracks(store: &SqliteVerseStore, ids: &[String]) -> Result<Vec<QueueItem>, CoreError> {
    ids.iter().map(|id| store.track(&TrackId::new(id))).collect()
}

async fn play(
    config: LectioConfig,
    store: SqliteVerseStore,
    items: Vec<QueueItem>,
    speed: u32,
    json: bool,
) {
    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let tick_interval = Duration::from_millis(config.playback.tick_interval_ms);
    let (engine, clock) = sim_engine::channel();
    let controller = PlaybackController::new(Box::new(engine), Box::new(store), config.playback);
    let (service, player) = PlayerService::new(controller, Some(cancel_token.clone()));

    let snapshots = player.subscribe();
    let service_task = service.start();
    let clock_task = clock.start(player.clone(), tick_interval, speed, cancel_token.clone());
    let log_task = tokio::spawn(log_snapshots(snapshots, json, cancel_token.clone()));

    info!("Queueing {} track(s)", items.len());
    for item in items {
        if player.enqueue(item, None).is_err() {
            break;
        }
    }
    if let Err(e) = player.play_queue_index(0) {
        warn!("Could not start playback: {e}");
    }

    let _ = log_task.await;
    cancel_token.cancel();
    let _ = clock_task.await;
    let _ = service_task.await;
    info!("Player stopped");
}

/// Log snapshot changes until the queue finishes or shutdown is requested
async fn log_snapshots(
    mut rx: broadcast::Receiver<PlaybackSnapshot>,
    json: bool,
    cancel_token: CancellationToken,
) {
    let mut previous = PlaybackSnapshot::default();
    let mut started = false;

    loop {
        let snapshot = tokio::select! {
            () = cancel_token.cancelled() => break,
            received = rx.recv() => match received {
                Ok(snapshot) => snapshot,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Missed {} snapshots", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        if json {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to serialize snapshot: {e}"),
            }
        } else {
            log_changes(&previous, &snapshot);
        }

        if snapshot.current_track.is_some() {
            started = true;
        } else if started {
            info!("Queue finished");
            break;
        }
        previous = snapshot;
    }
}

fn log_changes(previous: &PlaybackSnapshot, current: &PlaybackSnapshot) {
    if current.current_track != previous.current_track {
        match &current.current_track {
            Some(track) => info!(
                "Now playing: {} [{}] ({})",
                track.label(),
                current.cursor.map_or_else(|| "-".to_string(), |c| (c + 1).to_string()),
                format_position(track.duration_ms)
            ),
            None => info!("Playback stopped"),
        }
    }
    if current.active_verse != previous.active_verse {
        if let Some(verse) = current.active_verse {
            info!("Verse {} at {}", verse, format_position(current.position_ms));
        }
    }
    if current.is_playing != previous.is_playing && current.current_track.is_some() {
        info!("{}", if current.is_playing { "Playing" } else { "Paused" });
    }
    if current.transition_state != previous.transition_state {
        info!("Display mode: {:?}", current.transition_state);
    }
    if current.last_error != previous.last_error {
        if let Some(err) = &current.last_error {
            warn!("Playback error: {}", err.reason);
        }
    }
}

/// Peek at `[logging] file_enabled` so tracing can start before the config
/// is fully loaded. A missing or unreadable file means console-only logging.
fn check_file_logging_enabled(path: Option<&Path>) -> bool {
    let config_path = path.map_or_else(LectioConfig::config_path, Path::to_path_buf);
    let Ok(content) = std::fs::read_to_string(&config_path) else {
        return false;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        return false;
    };

    table
        .get("logging")
        .and_then(|logging| logging.get("file_enabled"))
        .and_then(toml::Value::as_bool)
        .unwrap_or(false)
}

/// Console logging filtered by `RUST_LOG` (default `info`), mirrored into
/// `lectio.log` when file logging is on
fn init_tracing(log_to_file: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = log_to_file.then(open_log_file).flatten().map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(Arc::new(file))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
}

fn open_log_file() -> Option<File> {
    let log_path = lectio_core::paths::log_path();
    if let Some(dir) = log_path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }

    match File::create(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            // Tracing is not up yet
            eprintln!("Cannot write log file {}: {e}", log_path.display());
            None
        }
    }
}
