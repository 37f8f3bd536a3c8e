//! Offline note-position migration.
//!
//! Recomputes, for every olfactory note, how often perfumes use it in each
//! pyramid position, derives the canonical `suggested_positions` list from
//! those counts, and clears the legacy single-position field. The batch is
//! idempotent: rerunning it recomputes the same counters.
//!
//! Invoked manually via the `sillage-migrate-notes` binary; never part of
//! the request path.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use sillage_core::{NotePosition, Parfum, PositionUsage, Result};

use crate::Database;

/// A position is flagged "popular" once this many perfumes use it.
pub const POPULAR_USAGE_THRESHOLD: i64 = 10;

/// A position is suggested once this many perfumes use it.
pub const SUGGESTED_USAGE_THRESHOLD: i64 = 3;

/// Outcome of one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Notes examined.
    pub notes_processed: usize,
    /// Notes whose usage counts produced at least one suggested position.
    pub derived: usize,
    /// Notes that fell back to their legacy single position.
    pub fallbacks: usize,
}

/// Tally per-note position usage across all perfumes' pyramid lists.
///
/// The legacy flat `note_ids` list carries no position information and
/// does not contribute.
pub fn tally_position_usage(parfums: &[Parfum]) -> HashMap<Uuid, PositionUsage> {
    let mut usage: HashMap<Uuid, PositionUsage> = HashMap::new();
    for parfum in parfums {
        for (position, ids) in [
            (NotePosition::Top, &parfum.top_note_ids),
            (NotePosition::Heart, &parfum.heart_note_ids),
            (NotePosition::Base, &parfum.base_note_ids),
        ] {
            for id in ids {
                usage.entry(*id).or_default().bump(position);
            }
        }
    }
    usage
}

/// Positions used often enough to flag as popular.
pub fn popular_positions(usage: &PositionUsage) -> Vec<NotePosition> {
    NotePosition::ALL
        .into_iter()
        .filter(|p| usage.get(*p) >= POPULAR_USAGE_THRESHOLD)
        .collect()
}

/// Derive the suggested positions from usage counts.
///
/// Positions used at least [`SUGGESTED_USAGE_THRESHOLD`] times qualify;
/// when none do, the legacy single position (if any) is carried over.
pub fn derive_suggested(
    usage: &PositionUsage,
    legacy: Option<NotePosition>,
) -> Vec<NotePosition> {
    let suggested: Vec<NotePosition> = NotePosition::ALL
        .into_iter()
        .filter(|p| usage.get(*p) >= SUGGESTED_USAGE_THRESHOLD)
        .collect();
    if suggested.is_empty() {
        legacy.into_iter().collect()
    } else {
        suggested
    }
}

/// Run the full migration against the database.
pub async fn run_position_migration(db: &Database) -> Result<MigrationReport> {
    use sillage_core::{OlfactoryNoteRepository, ParfumRepository};

    let parfums = db.parfums.list_all().await?;
    let notes = db.notes.list_all().await?;
    let usage_by_note = tally_position_usage(&parfums);

    let mut report = MigrationReport::default();
    for note in notes {
        let usage = usage_by_note.get(&note.id).copied().unwrap_or_default();
        let qualified = NotePosition::ALL
            .into_iter()
            .any(|p| usage.get(p) >= SUGGESTED_USAGE_THRESHOLD);
        let suggested = derive_suggested(&usage, note.legacy_position);

        db.notes
            .apply_position_migration(note.id, usage, suggested.clone())
            .await?;

        report.notes_processed += 1;
        if qualified {
            report.derived += 1;
        } else if !suggested.is_empty() {
            report.fallbacks += 1;
        }
    }

    info!(
        subsystem = "migration",
        component = "note_positions",
        notes_processed = report.notes_processed,
        derived = report.derived,
        fallbacks = report.fallbacks,
        "Note position migration complete"
    );
    Ok(report)
}
