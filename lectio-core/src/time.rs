//! Time and duration conversion utilities.
//!
//! Playback positions are carried as whole milliseconds (`u64`) throughout the
//! engine; these helpers convert to and from [`Duration`] with explicit
//! saturation instead of truncating casts.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    ///
    /// Durations exceeding `u64::MAX` milliseconds would represent ~584 million years.
    fn as_millis_u64(&self) -> u64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Format a millisecond position as `m:ss`, or `h:mm:ss` past the hour.
#[must_use]
pub fn format_position(position_ms: u64) -> String {
    let total_secs = position_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
