use crate::queue::QueueItem;
use crate::verse::VerseTimeline;
use serde::Serialize;

/// Live playback state owned by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    /// Loaded track (None when stopped)
    pub current_track: Option<QueueItem>,
    /// Playback position in milliseconds
    pub position_ms: u64,
    /// Whether audio is currently playing
    pub is_playing: bool,
    /// Verse under the playhead; derived from `position_ms`, never set directly
    pub active_verse: Option<u32>,
}

impl PlaybackState {
    /// Duration of the loaded track, or 0 when stopped
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.current_track.as_ref().map_or(0, |track| track.duration_ms)
    }

    /// Duration of the loaded track, `None` when stopped or unknown (0)
    #[must_use]
    pub fn known_duration_ms(&self) -> Option<u64> {
        Some(self.duration_ms()).filter(|&duration| duration > 0)
    }

    /// Clamp a position into `[0, duration]` of the loaded track.
    ///
    /// An unknown duration falls back to `fallback_ms` (typically the end of
    /// the verse timeline); when that is 0 too the position is left unbounded.
    #[must_use]
    pub fn clamp_position(&self, position_ms: u64, fallback_ms: u64) -> u64 {
        let limit = self
            .known_duration_ms()
            .or_else(|| Some(fallback_ms).filter(|&fallback| fallback > 0));
        limit.map_or(position_ms, |limit| position_ms.min(limit))
    }

    /// Move the playhead and recompute the active verse.
    ///
    /// Returns `true` if the position or active verse changed.
    pub fn set_position(&mut self, position_ms: u64, timeline: &VerseTimeline) -> bool {
        let active_verse = timeline.resolve(position_ms);
        let changed = self.position_ms != position_ms || self.active_verse != active_verse;
        self.position_ms = position_ms;
        self.active_verse = active_verse;
        changed
    }

    /// Switch to a freshly loaded track at position 0.
    ///
    /// The active verse stays cleared until the first engine tick resolves it.
    pub fn start_track(&mut self, track: QueueItem) {
        self.current_track = Some(track);
        self.position_ms = 0;
        self.active_verse = None;
        self.is_playing = true;
    }

    /// Unload the track and return to the idle state
    pub fn stop(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ItemKind;
    use crate::verse::VerseSpan;

    fn timeline() -> VerseTimeline {
        VerseTimeline::new(vec![VerseSpan::new(1, 0, 5000), VerseSpan::new(2, 5000, 12000)])
            .unwrap()
    }

    #[test]
    fn test_playback_state_default() {
        let state = PlaybackState::default();
        assert!(!state.is_playing);
        assert!(state.current_track.is_none());
        assert_eq!(state.position_ms, 0);
        assert_eq!(state.active_verse, None);
        assert_eq!(state.duration_ms(), 0);
    }

    #[test]
    fn test_start_track_resets_position() {
        let mut state = PlaybackState::default();
        state.set_position(7000, &timeline());
        state.start_track(QueueItem::new("a", ItemKind::Chapter, 12000));

        assert!(state.is_playing);
        assert_eq!(state.position_ms, 0);
        assert_eq!(state.active_verse, None);
        assert_eq!(state.duration_ms(), 12000);
    }

    #[test]
    fn test_set_position_resolves_verse() {
        let mut state = PlaybackState::default();
        assert!(state.set_position(6000, &timeline()));
        assert_eq!(state.active_verse, Some(2));
        assert!(!state.set_position(6000, &timeline()));
    }

    #[test]
    fn test_clamp_position() {
        let mut state = PlaybackState::default();
        state.start_track(QueueItem::new("a", ItemKind::Chapter, 12000));
        assert_eq!(state.clamp_position(5000, 0), 5000);
        assert_eq!(state.clamp_position(50_000, 0), 12000);
        // A known duration wins over the fallback
        assert_eq!(state.clamp_position(50_000, 30_000), 12000);
    }

    #[test]
    fn test_clamp_position_unknown_duration() {
        let mut state = PlaybackState::default();
        state.start_track(QueueItem::new("a", ItemKind::Chapter, 0));
        assert_eq!(state.known_duration_ms(), None);
        assert_eq!(state.clamp_position(7000, 12000), 7000);
        assert_eq!(state.clamp_position(50_000, 12000), 12000);
        assert_eq!(state.clamp_position(50_000, 0), 50_000);
    }
}
