//! Play queue with a cursor that tracks the currently loaded item.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a playable track (book, chapter or verse audio).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Granularity of a queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Book,
    Chapter,
    Verse,
}

impl ItemKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Chapter => "chapter",
            Self::Verse => "verse",
        }
    }
}

/// A playable entry in the queue.
///
/// Equality compares every field, but queue positions are independent: the
/// same content queued twice occupies two positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub track_id: TrackId,
    pub kind: ItemKind,
    pub duration_ms: u64,
    /// Display title, e.g. "John 3"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl QueueItem {
    pub fn new(track_id: impl Into<String>, kind: ItemKind, duration_ms: u64) -> Self {
        Self {
            track_id: TrackId::new(track_id),
            kind,
            duration_ms,
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title if set, otherwise the track id
    #[must_use]
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| self.track_id.as_str())
    }
}

/// Result of removing an item from the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub item: QueueItem,
    /// The removed item was the one under the cursor
    pub was_current: bool,
}

/// Ordered queue of items plus the cursor of the loaded item.
///
/// Every operation validates its arguments before mutating, so a failed call
/// leaves the queue untouched.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    items: Vec<QueueItem>,
    cursor: Option<usize>,
}

impl Queue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item under the cursor
    #[must_use]
    pub fn current(&self) -> Option<&QueueItem> {
        self.cursor.and_then(|idx| self.items.get(idx))
    }

    /// Insert `item` at `position` (end of queue when `None` or past the end).
    ///
    /// Returns the index the item landed at.
    pub fn add(&mut self, item: QueueItem, position: Option<usize>) -> usize {
        let index = position.map_or(self.items.len(), |p| p.min(self.items.len()));
        self.items.insert(index, item);

        if let Some(cursor) = self.cursor {
            if index <= cursor {
                self.cursor = Some(cursor + 1);
            }
        }

        index
    }

    /// Remove the item at `index`.
    ///
    /// Removing the current item moves the cursor onto the item that followed
    /// it, or clears the cursor if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Result<Removed> {
        if index >= self.items.len() {
            return Err(CoreError::not_found(format!("queue index {index}")));
        }

        let item = self.items.remove(index);
        let was_current = self.cursor == Some(index);

        self.cursor = match self.cursor {
            Some(cursor) if cursor == index => (index < self.items.len()).then_some(index),
            Some(cursor) if index < cursor => Some(cursor - 1),
            other => other,
        };

        Ok(Removed { item, was_current })
    }

    /// Move the item at `from` so it ends up at index `to`.
    ///
    /// The cursor follows the logical item it pointed at, not the index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if either index is out of bounds.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len {
            return Err(CoreError::not_found(format!("queue index {from}")));
        }
        if to >= len {
            return Err(CoreError::not_found(format!("queue index {to}")));
        }
        if from == to {
            return Ok(());
        }

        let item = self.items.remove(from);
        self.items.insert(to, item);

        if let Some(cursor) = self.cursor {
            self.cursor = Some(if cursor == from {
                to
            } else if from < cursor && cursor <= to {
                cursor - 1
            } else if to <= cursor && cursor < from {
                cursor + 1
            } else {
                cursor
            });
        }

        Ok(())
    }

    /// Move the cursor to the next item.
    ///
    /// An unstarted queue advances to its first item. Returns `None` at the end
    /// of the queue, leaving the cursor where it was.
    pub fn advance(&mut self) -> Option<&QueueItem> {
        let next = self.cursor.map_or(0, |cursor| cursor + 1);
        if next >= self.items.len() {
            return None;
        }
        self.cursor = Some(next);
        self.items.get(next)
    }

    /// Move the cursor to the previous item, without wrapping.
    pub fn retreat(&mut self) -> Option<&QueueItem> {
        let prev = self.cursor?.checked_sub(1)?;
        self.cursor = Some(prev);
        self.items.get(prev)
    }

    /// Point the cursor directly at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if `index` is out of bounds.
    pub fn jump_to(&mut self, index: usize) -> Result<&QueueItem> {
        let len = self.items.len();
        if index >= len {
            return Err(CoreError::OutOfRange { index, len });
        }
        self.cursor = Some(index);
        Ok(&self.items[index])
    }

    /// Detach the cursor from the queue without touching its items.
    ///
    /// Used when the loaded track no longer corresponds to a queue entry.
    pub fn release_cursor(&mut self) {
        self.cursor = None;
    }

    /// Remove every item and reset the cursor
    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> QueueItem {
        QueueItem::new(id, ItemKind::Chapter, 60_000)
    }

    fn queue_of(ids: &[&str]) -> Queue {
        let mut queue = Queue::new();
        for id in ids {
            queue.add(item(id), None);
        }
        queue
    }

    fn ids(queue: &Queue) -> Vec<&str> {
        queue.items().iter().map(|i| i.track_id.as_str()).collect()
    }

    fn current_id(queue: &Queue) -> Option<&str> {
        queue.current().map(|i| i.track_id.as_str())
    }

    #[test]
    fn test_add_defaults_to_end() {
        let mut queue = queue_of(&["a", "b"]);
        assert_eq!(queue.add(item("c"), None), 2);
        assert_eq!(queue.add(item("d"), Some(99)), 3);
        assert_eq!(ids(&queue), vec!["a", "b", "c", "d"]);
        assert_eq!(queue.cursor(), None);
    }

    #[test]
    fn test_add_at_or_before_cursor_shifts_cursor() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.jump_to(1).unwrap();

        queue.add(item("x"), Some(1));
        assert_eq!(queue.cursor(), Some(2));
        assert_eq!(current_id(&queue), Some("b"));

        queue.add(item("y"), Some(0));
        assert_eq!(current_id(&queue), Some("b"));

        queue.add(item("z"), Some(4));
        assert_eq!(queue.cursor(), Some(3));
        assert_eq!(current_id(&queue), Some("b"));
    }

    #[test]
    fn test_duplicates_are_distinct_positions() {
        let mut queue = queue_of(&["a", "a"]);
        queue.jump_to(1).unwrap();
        let removed = queue.remove(0).unwrap();
        assert!(!removed.was_current);
        assert_eq!(queue.cursor(), Some(0));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_out_of_bounds_leaves_queue_unchanged() {
        let mut queue = queue_of(&["a"]);
        queue.jump_to(0).unwrap();
        assert!(matches!(queue.remove(1), Err(CoreError::NotFound { .. })));
        assert_eq!(ids(&queue), vec!["a"]);
        assert_eq!(queue.cursor(), Some(0));
    }

    #[test]
    fn test_remove_current_moves_to_next() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.jump_to(1).unwrap();
        let removed = queue.remove(1).unwrap();
        assert!(removed.was_current);
        assert_eq!(removed.item.track_id.as_str(), "b");
        assert_eq!(current_id(&queue), Some("c"));
    }

    #[test]
    fn test_remove_current_last_item_clears_cursor() {
        let mut queue = queue_of(&["a", "b"]);
        queue.jump_to(1).unwrap();
        queue.remove(1).unwrap();
        assert_eq!(queue.cursor(), None);
    }

    #[test]
    fn test_remove_only_item() {
        let mut queue = queue_of(&["a"]);
        queue.jump_to(0).unwrap();
        let removed = queue.remove(0).unwrap();
        assert!(removed.was_current);
        assert!(queue.is_empty());
        assert_eq!(queue.cursor(), None);
    }

    #[test]
    fn test_remove_before_cursor_keeps_identity() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.jump_to(2).unwrap();
        queue.remove(0).unwrap();
        assert_eq!(current_id(&queue), Some("c"));
    }

    #[test]
    fn test_reorder_cursor_follows_item() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.jump_to(1).unwrap();

        // Move the current item itself
        queue.reorder(1, 3).unwrap();
        assert_eq!(ids(&queue), vec!["a", "c", "d", "b"]);
        assert_eq!(current_id(&queue), Some("b"));

        // Move an item from before the cursor to after it
        queue.reorder(0, 3).unwrap();
        assert_eq!(ids(&queue), vec!["c", "d", "b", "a"]);
        assert_eq!(current_id(&queue), Some("b"));

        // Move an item from after the cursor to before it
        queue.reorder(3, 0).unwrap();
        assert_eq!(ids(&queue), vec!["a", "c", "d", "b"]);
        assert_eq!(current_id(&queue), Some("b"));
    }

    #[test]
    fn test_reorder_invalid_index() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(queue.reorder(0, 2).is_err());
        assert!(queue.reorder(5, 0).is_err());
        assert_eq!(ids(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_reorder_then_advance_visits_new_order() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.jump_to(0).unwrap();
        queue.reorder(3, 1).unwrap();
        queue.remove(2).unwrap();

        let mut visited = vec![current_id(&queue).unwrap().to_string()];
        while let Some(next) = queue.advance() {
            visited.push(next.track_id.to_string());
        }
        assert_eq!(visited, vec!["a", "d", "c"]);
    }

    #[test]
    fn test_advance_does_not_wrap() {
        let mut queue = queue_of(&["a", "b"]);
        assert_eq!(queue.advance().map(|i| i.track_id.as_str()), Some("a"));
        assert_eq!(queue.advance().map(|i| i.track_id.as_str()), Some("b"));
        assert!(queue.advance().is_none());
        assert_eq!(queue.cursor(), Some(1));
    }

    #[test]
    fn test_advance_empty() {
        let mut queue = Queue::new();
        assert!(queue.advance().is_none());
        assert_eq!(queue.cursor(), None);
    }

    #[test]
    fn test_retreat() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(queue.retreat().is_none());
        queue.jump_to(1).unwrap();
        assert_eq!(queue.retreat().map(|i| i.track_id.as_str()), Some("a"));
        assert!(queue.retreat().is_none());
        assert_eq!(queue.cursor(), Some(0));
    }

    #[test]
    fn test_jump_to_out_of_range() {
        let mut queue = queue_of(&["a"]);
        assert!(matches!(
            queue.jump_to(3),
            Err(CoreError::OutOfRange { index: 3, len: 1 })
        ));
        assert_eq!(queue.cursor(), None);
    }

    #[test]
    fn test_clear() {
        let mut queue = queue_of(&["a", "b"]);
        queue.jump_to(1).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.cursor(), None);
    }

    #[test]
    fn test_release_cursor_keeps_items() {
        let mut queue = queue_of(&["a", "b"]);
        queue.jump_to(1).unwrap();
        queue.release_cursor();
        assert_eq!(ids(&queue), vec!["a", "b"]);
        assert_eq!(queue.cursor(), None);

        let removed = queue.remove(1).unwrap();
        assert!(!removed.was_current);
        assert_eq!(current_id(&queue), None);
    }

    #[test]
    fn test_item_label() {
        let plain = item("jhn.3");
        assert_eq!(plain.label(), "jhn.3");
        assert_eq!(plain.with_title("John 3").label(), "John 3");
    }
}
