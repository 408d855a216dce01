//! Content store boundary: verse timing tables per track.

use crate::error::{CoreError, Result};
use crate::queue::{ItemKind, QueueItem, TrackId};
use crate::verse::{VerseSpan, VerseTimeline};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const SCHEMA_SQL: &str = r"
-- Playable tracks (book, chapter or single-verse audio)
CREATE TABLE IF NOT EXISTS tracks (
    track_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    title TEXT,
    duration_ms INTEGER NOT NULL
);

-- Verse timing within each track's audio
CREATE TABLE IF NOT EXISTS verse_timing (
    track_id TEXT NOT NULL,
    verse INTEGER NOT NULL,
    start_ms INTEGER NOT NULL,
    end_ms INTEGER NOT NULL,
    PRIMARY KEY (track_id, verse)
);

CREATE INDEX IF NOT EXISTS idx_verse_timing_start ON verse_timing(track_id, start_ms);
";

/// Source of verse timing tables.
pub trait VerseSource: Send {
    /// Load the verse timing table for a track.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the track has no indexed verse timing.
    fn verse_spans(&self, track_id: &TrackId) -> Result<VerseTimeline>;
}

/// In-memory verse source, used for tests and preloaded content
#[derive(Debug, Clone, Default)]
pub struct MemoryVerseStore {
    timelines: HashMap<TrackId, VerseTimeline>,
}

impl MemoryVerseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track_id: TrackId, timeline: VerseTimeline) {
        self.timelines.insert(track_id, timeline);
    }

    #[must_use]
    pub fn with(mut self, track_id: impl Into<String>, timeline: VerseTimeline) -> Self {
        self.insert(TrackId::new(track_id), timeline);
        self
    }
}

impl VerseSource for MemoryVerseStore {
    fn verse_spans(&self, track_id: &TrackId) -> Result<VerseTimeline> {
        self.timelines
            .get(track_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("verse timing for {track_id}")))
    }
}

/// SQLite-backed store of tracks and their verse timing
pub struct SqliteVerseStore {
    conn: Connection,
}

impl SqliteVerseStore {
    /// Open or create a store at the given path
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn)?;
        info!("Verse store opened at {}", path.display());
        Ok(store)
    }

    /// Open a transient in-memory store
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Insert or replace a track row
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the duration does not fit SQLite's integer type.
    pub fn insert_track(&self, item: &QueueItem) -> Result<()> {
        write_track(&self.conn, item)
    }

    /// Look up a track as a queue item
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown tracks, or a database error.
    pub fn track(&self, track_id: &TrackId) -> Result<QueueItem> {
        let row = self
            .conn
            .query_row(
                "SELECT kind, title, duration_ms FROM tracks WHERE track_id = ?1",
                params![track_id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((kind, title, duration_ms)) = row else {
            return Err(CoreError::not_found(format!("track {track_id}")));
        };

        let kind = parse_kind(&kind).ok_or_else(|| CoreError::InvalidTimeline {
            reason: format!("track {track_id} has unknown kind {kind:?}"),
        })?;

        Ok(QueueItem {
            track_id: track_id.clone(),
            kind,
            duration_ms: from_sql_ms(duration_ms)?,
            title,
        })
    }

    /// Replace the verse timing for a track
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert_timeline(&mut self, track_id: &TrackId, timeline: &VerseTimeline) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_timeline(&tx, track_id, timeline)?;
        tx.commit()?;
        Ok(())
    }

    /// Store a batch of tracks, each with optional verse timing, in a single
    /// transaction. Nothing is written if any entry fails.
    ///
    /// # Errors
    ///
    /// Returns the first write error; the store is left as it was.
    pub fn import(&mut self, entries: &[(QueueItem, Option<VerseTimeline>)]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for (item, timeline) in entries {
            write_track(&tx, item)?;
            if let Some(timeline) = timeline {
                write_timeline(&tx, &item.track_id, timeline)?;
            }
        }
        tx.commit()?;

        info!("Stored {} track(s)", entries.len());
        Ok(entries.len())
    }
}

fn write_track(conn: &Connection, item: &QueueItem) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO tracks (track_id, kind, title, duration_ms) \
         VALUES (?1, ?2, ?3, ?4)",
        params![
            item.track_id.as_str(),
            item.kind.as_str(),
            item.title,
            to_sql_ms(item.duration_ms)?,
        ],
    )?;
    Ok(())
}

/// Replace a track's verse timing on `conn`; callers own the transaction
fn write_timeline(conn: &Connection, track_id: &TrackId, timeline: &VerseTimeline) -> Result<()> {
    conn.execute(
        "DELETE FROM verse_timing WHERE track_id = ?1",
        params![track_id.as_str()],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO verse_timing (track_id, verse, start_ms, end_ms) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for span in timeline.spans() {
        stmt.execute(params![
            track_id.as_str(),
            span.verse,
            to_sql_ms(span.start_ms)?,
            to_sql_ms(span.end_ms)?,
        ])?;
    }

    debug!(
        "Stored {} verse spans for {}",
        timeline.spans().len(),
        track_id
    );
    Ok(())
}

impl VerseSource for SqliteVerseStore {
    fn verse_spans(&self, track_id: &TrackId) -> Result<VerseTimeline> {
        let mut stmt = self.conn.prepare(
            "SELECT verse, start_ms, end_ms FROM verse_timing \
             WHERE track_id = ?1 ORDER BY start_ms",
        )?;
        let rows = stmt.query_map(params![track_id.as_str()], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut spans = Vec::new();
        for row in rows {
            let (verse, start_ms, end_ms) = row?;
            spans.push(VerseSpan::new(
                verse,
                from_sql_ms(start_ms)?,
                from_sql_ms(end_ms)?,
            ));
        }

        if spans.is_empty() {
            return Err(CoreError::not_found(format!("verse timing for {track_id}")));
        }

        VerseTimeline::new(spans)
    }
}

fn parse_kind(s: &str) -> Option<ItemKind> {
    match s {
        "book" => Some(ItemKind::Book),
        "chapter" => Some(ItemKind::Chapter),
        "verse" => Some(ItemKind::Verse),
        _ => None,
    }
}

fn to_sql_ms(ms: u64) -> Result<i64> {
    i64::try_from(ms).map_err(|_| CoreError::InvalidTimeline {
        reason: format!("{ms}ms does not fit in the database"),
    })
}

fn from_sql_ms(ms: i64) -> Result<u64> {
    u64::try_from(ms).map_err(|_| CoreError::InvalidTimeline {
        reason: format!("negative time {ms}ms in database"),
    })
}
