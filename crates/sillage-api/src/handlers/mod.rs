//! HTTP handlers, grouped by domain.

pub mod admin;
pub mod notes;
pub mod parfums;
pub mod users;

use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use sillage_core::{OlfactoryNote, OlfactoryNoteRepository, Parfum, ParfumWithNotes};
use sillage_db::Database;

use crate::error::ApiError;

/// Common `page`/`limit` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Parse a comma-separated UUID list, rejecting malformed entries.
///
/// Used for write-path fields, where silently dropping ids would hide
/// client bugs; the read-path `notes` filter uses the lenient parser from
/// sillage-core instead.
pub fn parse_uuid_list_strict(raw: &str) -> Result<Vec<Uuid>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            Uuid::parse_str(part)
                .map_err(|_| ApiError::BadRequest(format!("'{}' is not a valid id", part)))
        })
        .collect()
}

/// Parse a path id, answering 400 on malformed input.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid {} id", what)))
}

/// Populate note references on a page of perfumes.
///
/// One `fetch_many` covers the whole page; dangling references are
/// silently skipped. Listing projections omit note descriptions, detail
/// views include them.
pub async fn populate_parfums(
    db: &Database,
    parfums: Vec<Parfum>,
    with_description: bool,
) -> Result<Vec<ParfumWithNotes>, ApiError> {
    let mut all_ids: Vec<Uuid> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for parfum in &parfums {
        for id in parfum.all_note_ids() {
            if seen.insert(id) {
                all_ids.push(id);
            }
        }
    }

    let notes = db.notes.fetch_many(&all_ids).await?;
    let by_id: HashMap<Uuid, OlfactoryNote> =
        notes.into_iter().map(|note| (note.id, note)).collect();

    Ok(parfums
        .into_iter()
        .map(|parfum| {
            let notes = parfum
                .all_note_ids()
                .iter()
                .filter_map(|id| by_id.get(id))
                .map(|note| note.projection(with_description))
                .collect();
            ParfumWithNotes { parfum, notes }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid_list_strict_rejects_garbage() {
        let a = Uuid::new_v4();
        let ok = parse_uuid_list_strict(&format!("{}, {}", a, a)).unwrap();
        assert_eq!(ok, vec![a, a]);
        assert!(parse_uuid_list_strict("").unwrap().is_empty());
        assert!(parse_uuid_list_strict("abc").is_err());
        assert!(parse_uuid_list_strict(&format!("{},abc", a)).is_err());
    }

    #[test]
    fn test_parse_id_messages_name_the_entity() {
        let err = parse_id("zzz", "parfum").unwrap_err();
        match err {
            ApiError::BadRequest(msg) => assert_eq!(msg, "invalid parfum id"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }
}
