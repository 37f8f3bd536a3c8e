//! View-history list manipulation.
//!
//! The history is an ordered, most-recent-first list embedded in the user
//! document, capped at [`HISTORY_CAP`] entries. Re-visiting a perfume moves
//! its entry to the front with a fresh timestamp.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::HistoryEntry;

/// Maximum number of history entries kept per user.
pub const HISTORY_CAP: usize = 50;

/// Insert a visit at the front of the history.
///
/// Any existing entry for the same perfume is removed first, then the list
/// is truncated to the cap (oldest entries dropped).
pub fn push_visit(
    mut history: Vec<HistoryEntry>,
    parfum_id: Uuid,
    visited_at: DateTime<Utc>,
) -> Vec<HistoryEntry> {
    history.retain(|entry| entry.parfum_id != parfum_id);
    history.insert(
        0,
        HistoryEntry {
            parfum_id,
            visited_at,
        },
    );
    history.truncate(HISTORY_CAP);
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_visit_prepends() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let history = push_visit(vec![], a, Utc::now());
        let history = push_visit(history, b, Utc::now());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].parfum_id, b);
        assert_eq!(history[1].parfum_id, a);
    }

    #[test]
    fn test_push_visit_moves_duplicate_to_front() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let history = push_visit(vec![], a, Utc::now());
        let history = push_visit(history, b, Utc::now());
        let history = push_visit(history, a, Utc::now());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].parfum_id, a);
        assert_eq!(history[1].parfum_id, b);
    }

    #[test]
    fn test_push_visit_caps_at_50_most_recent_first() {
        let mut history = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..51 {
            let id = Uuid::new_v4();
            ids.push(id);
            history = push_visit(history, id, Utc::now());
        }
        assert_eq!(history.len(), HISTORY_CAP);
        // Most recent first; the very first visit fell off the end.
        assert_eq!(history[0].parfum_id, ids[50]);
        assert_eq!(history[49].parfum_id, ids[1]);
        assert!(!history.iter().any(|e| e.parfum_id == ids[0]));
    }
}
