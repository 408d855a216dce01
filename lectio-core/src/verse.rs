//! Verse timing tables and the timestamp → verse lookup.

use crate::error::{CoreError, Result};
use std::sync::Arc;

/// The time interval during which one verse's audio is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseSpan {
    /// Verse number within the track (1-based)
    pub verse: u32,
    /// Inclusive start of the verse, in milliseconds from track start
    pub start_ms: u64,
    /// Exclusive end of the verse, in milliseconds from track start
    pub end_ms: u64,
}

impl VerseSpan {
    #[must_use]
    pub const fn new(verse: u32, start_ms: u64, end_ms: u64) -> Self {
        Self {
            verse,
            start_ms,
            end_ms,
        }
    }

    /// Check if the position falls inside `[start_ms, end_ms)`
    #[must_use]
    pub const fn contains(&self, position_ms: u64) -> bool {
        self.start_ms <= position_ms && position_ms < self.end_ms
    }
}

/// Resolve the verse playing at `position_ms`.
///
/// `spans` must be sorted by `start_ms`. Returns `None` for an empty table or a
/// position before the first verse. Positions past the last span clamp to the
/// last verse, and a position exactly on a boundary belongs to the later verse.
#[must_use]
pub fn resolve(spans: &[VerseSpan], position_ms: u64) -> Option<u32> {
    // Number of spans that have started at or before the position
    let started = spans.partition_point(|span| span.start_ms <= position_ms);
    started.checked_sub(1).map(|idx| spans[idx].verse)
}

/// Validated, immutable verse timing table for one track.
///
/// Cloning is cheap; the spans are shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerseTimeline {
    spans: Arc<[VerseSpan]>,
}

impl VerseTimeline {
    /// Build a timeline from spans sorted by start time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeline`] if a span has verse number 0, is
    /// empty, or overlaps / precedes the span before it.
    pub fn new(spans: Vec<VerseSpan>) -> Result<Self> {
        for span in &spans {
            if span.verse == 0 {
                return Err(invalid("verse numbers start at 1"));
            }
            if span.end_ms <= span.start_ms {
                return Err(invalid(format!(
                    "verse {} ends at {}ms, not after its start {}ms",
                    span.verse, span.end_ms, span.start_ms
                )));
            }
        }

        for pair in spans.windows(2) {
            if pair[1].start_ms < pair[0].end_ms {
                return Err(invalid(format!(
                    "verse {} starts at {}ms, inside verse {}",
                    pair[1].verse, pair[1].start_ms, pair[0].verse
                )));
            }
        }

        Ok(Self {
            spans: spans.into(),
        })
    }

    #[must_use]
    pub fn spans(&self) -> &[VerseSpan] {
        &self.spans
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Active verse at a playback position (see [`resolve`])
    #[must_use]
    pub fn resolve(&self, position_ms: u64) -> Option<u32> {
        resolve(&self.spans, position_ms)
    }

    /// Span for a verse number, if the verse is in this track
    #[must_use]
    pub fn span(&self, verse: u32) -> Option<&VerseSpan> {
        self.spans.iter().find(|span| span.verse == verse)
    }

    /// Start time of a verse, used for tap-to-seek
    #[must_use]
    pub fn start_of(&self, verse: u32) -> Option<u64> {
        self.span(verse).map(|span| span.start_ms)
    }

    /// End of the last verse; equals the track duration for a complete table
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.spans.last().map_or(0, |span| span.end_ms)
    }
}

fn invalid(reason: impl Into<String>) -> CoreError {
    CoreError::InvalidTimeline {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter() -> Vec<VerseSpan> {
        vec![
            VerseSpan::new(1, 0, 5000),
            VerseSpan::new(2, 5000, 12000),
            VerseSpan::new(3, 12000, 20000),
        ]
    }

    #[test]
    fn test_resolve_inside_span() {
        let spans = chapter();
        assert_eq!(resolve(&spans, 0), Some(1));
        assert_eq!(resolve(&spans, 4999), Some(1));
        assert_eq!(resolve(&spans, 7000), Some(2));
        assert_eq!(resolve(&spans, 19999), Some(3));
    }

    #[test]
    fn test_resolve_boundary_goes_to_later_verse() {
        let spans = chapter();
        assert_eq!(resolve(&spans, 5000), Some(2));
        assert_eq!(resolve(&spans, 12000), Some(3));
    }

    #[test]
    fn test_resolve_past_end_clamps_to_last_verse() {
        let spans = chapter();
        assert_eq!(resolve(&spans, 20000), Some(3));
        assert_eq!(resolve(&spans, 600_000), Some(3));
    }

    #[test]
    fn test_resolve_empty() {
        assert_eq!(resolve(&[], 0), None);
        assert_eq!(resolve(&[], 1000), None);
    }

    #[test]
    fn test_resolve_before_first_span() {
        // Leading silence before verse 1
        let spans = vec![VerseSpan::new(1, 1500, 4000), VerseSpan::new(2, 4000, 9000)];
        assert_eq!(resolve(&spans, 0), None);
        assert_eq!(resolve(&spans, 1499), None);
        assert_eq!(resolve(&spans, 1500), Some(1));
    }

    #[test]
    fn test_resolve_matches_linear_scan() {
        let spans: Vec<_> = (0..180u32)
            .map(|i| {
                let start = u64::from(i) * 7_300;
                VerseSpan::new(i + 1, start, start + 7_300)
            })
            .collect();

        for position in (0..1_400_000u64).step_by(997) {
            let expected = spans
                .iter()
                .find(|span| span.contains(position))
                .or_else(|| spans.last().filter(|last| position >= last.end_ms))
                .map(|span| span.verse);
            assert_eq!(resolve(&spans, position), expected, "position {position}");
        }
    }

    #[test]
    fn test_timeline_lookup() {
        let timeline = VerseTimeline::new(chapter()).unwrap();
        assert_eq!(timeline.start_of(2), Some(5000));
        assert_eq!(timeline.start_of(9), None);
        assert_eq!(timeline.duration_ms(), 20000);
        assert_eq!(timeline.resolve(13000), Some(3));
    }

    #[test]
    fn test_timeline_rejects_overlap() {
        let spans = vec![VerseSpan::new(1, 0, 5000), VerseSpan::new(2, 4000, 9000)];
        assert!(matches!(
            VerseTimeline::new(spans),
            Err(CoreError::InvalidTimeline { .. })
        ));
    }

    #[test]
    fn test_timeline_rejects_empty_span_and_verse_zero() {
        assert!(VerseTimeline::new(vec![VerseSpan::new(1, 100, 100)]).is_err());
        assert!(VerseTimeline::new(vec![VerseSpan::new(0, 0, 100)]).is_err());
    }

    #[test]
    fn test_empty_timeline() {
        let timeline = VerseTimeline::default();
        assert!(timeline.is_empty());
        assert_eq!(timeline.resolve(1000), None);
        assert_eq!(timeline.duration_ms(), 0);
    }
}
