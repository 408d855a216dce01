//! JSON import of tracks and verse timings into the content database.

use lectio_core::{
    CoreError, ItemKind, QueueItem, SqliteVerseStore, TrackId, VerseSpan, VerseTimeline,
};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Failure while importing a content file
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read import file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid import file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Track {track_id}: {source}")]
    Track {
        track_id: String,
        #[source]
        source: CoreError,
    },

    #[error("Failed to store import: {0}")]
    Store(#[from] CoreError),
}

/// One track entry in an import file
#[derive(Debug, Deserialize)]
pub struct TrackRecord {
    pub track_id: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub title: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub verses: Vec<VerseRecord>,
}

#[derive(Debug, Deserialize)]
pub struct VerseRecord {
    pub verse: u32,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TrackRecord {
    fn item(&self) -> QueueItem {
        QueueItem {
            track_id: TrackId::new(&self.track_id),
            kind: self.kind,
            duration_ms: self.duration_ms,
            title: self.title.clone(),
        }
    }

    /// Validated timing, `None` for tracks without verses.
    ///
    /// The last verse must end with the audio unless the duration is unknown (0).
    fn timeline(&self) -> Result<Option<VerseTimeline>, CoreError> {
        if self.verses.is_empty() {
            return Ok(None);
        }

        let mut spans: Vec<_> = self
            .verses
            .iter()
            .map(|v| VerseSpan::new(v.verse, v.start_ms, v.end_ms))
            .collect();
        spans.sort_by_key(|span| span.start_ms);
        let timeline = VerseTimeline::new(spans)?;

        if self.duration_ms > 0 && timeline.duration_ms() != self.duration_ms {
            return Err(CoreError::InvalidTimeline {
                reason: format!(
                    "last verse ends at {}ms but the track is {}ms long",
                    timeline.duration_ms(),
                    self.duration_ms
                ),
            });
        }
        Ok(Some(timeline))
    }
}

/// Parse an import file's JSON text
///
/// # Errors
///
/// Returns an error if the JSON does not match the import format.
pub fn parse(json: &str) -> Result<Vec<TrackRecord>, ImportError> {
    Ok(serde_json::from_str(json)?)
}

/// Validate every record, then store them all at once; tracks without verses
/// are stored without timing. Nothing is written if any record is invalid.
///
/// # Errors
///
/// Returns an error naming the first track whose timing is invalid, or the
/// database error that rolled the import back.
pub fn store_records(
    store: &mut SqliteVerseStore,
    records: &[TrackRecord],
) -> Result<usize, ImportError> {
    let entries = records
        .iter()
        .map(|record| -> Result<_, ImportError> {
            let timeline = record.timeline().map_err(|source| ImportError::Track {
                track_id: record.track_id.clone(),
                source,
            })?;
            Ok((record.item(), timeline))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(store.import(&entries)?)
}

/// Import a JSON file into the store
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or stored.
pub fn import_file(store: &mut SqliteVerseStore, path: &Path) -> Result<usize, ImportError> {
    let json = std::fs::read_to_string(path)?;
    let records = parse(&json)?;
    let count = store_records(store, &records)?;
    info!("Imported {} track(s) from {}", count, path.display());
    Ok(count)
}
