//! Note-overlap similarity scoring.
//!
//! Similarity between a candidate perfume and a reference set is the count
//! of olfactory notes they share; the percentage is that count over the
//! size of the reference note set. Ranking is score descending with
//! popularity descending as the tie-breaker.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{Parfum, ScoredParfum};

/// Default result cap for the multi-reference similarity endpoint.
pub const DEFAULT_SIMILARITY_LIMIT: usize = 10;

/// Hard cap for the multi-reference similarity endpoint.
pub const MAX_SIMILARITY_LIMIT: usize = 50;

/// Result count for the single-perfume "similar to X" endpoint.
pub const SIMILAR_TO_ONE_LIMIT: usize = 6;

/// Maximum number of reference ids accepted by the similarity endpoint.
pub const MAX_REFERENCE_IDS: usize = 50;

/// Collect the distinct union of note ids across the reference perfumes.
pub fn reference_note_set(references: &[Parfum]) -> HashSet<Uuid> {
    references
        .iter()
        .flat_map(|p| p.all_note_ids())
        .collect()
}

/// Score and rank candidates against a reference note set.
///
/// Candidates sharing no notes are dropped. With an empty reference set
/// the result is empty (not an error).
pub fn rank_by_shared_notes(
    reference_notes: &HashSet<Uuid>,
    candidates: Vec<Parfum>,
    limit: usize,
) -> Vec<ScoredParfum> {
    if reference_notes.is_empty() {
        return Vec::new();
    }

    let total = reference_notes.len();
    let mut scored: Vec<ScoredParfum> = candidates
        .into_iter()
        .filter_map(|parfum| {
            let common = parfum
                .all_note_ids()
                .iter()
                .filter(|id| reference_notes.contains(id))
                .count();
            if common == 0 {
                return None;
            }
            let percentage = ((common as f64 / total as f64) * 100.0).round() as u32;
            Some(ScoredParfum {
                parfum,
                common_notes_count: common,
                similarity_percentage: percentage,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.common_notes_count
            .cmp(&a.common_notes_count)
            .then(b.parfum.popularity.cmp(&a.parfum.popularity))
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;
    use chrono::Utc;

    fn parfum(notes: Vec<Uuid>, popularity: i64) -> Parfum {
        Parfum {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            brand: "Brand".to_string(),
            genre: Genre::Mixte,
            description: None,
            note_ids: notes,
            top_note_ids: vec![],
            heart_note_ids: vec![],
            base_note_ids: vec![],
            photo_url: None,
            popularity,
            merchant_links: vec![],
            barcode: None,
            price: None,
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        }
    }

    #[test]
    fn test_two_of_three_common_notes_scores_67_percent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();

        let x = parfum(vec![a, b, c], 0);
        let y = parfum(vec![b, c, d], 0);

        let reference = reference_note_set(std::slice::from_ref(&x));
        let ranked = rank_by_shared_notes(&reference, vec![y], 10);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].common_notes_count, 2);
        assert_eq!(ranked[0].similarity_percentage, 67);
    }

    #[test]
    fn test_empty_reference_set_yields_empty_result() {
        let candidates = vec![parfum(vec![Uuid::new_v4()], 5)];
        let ranked = rank_by_shared_notes(&HashSet::new(), candidates, 10);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_zero_overlap_candidates_are_dropped() {
        let a = Uuid::new_v4();
        let reference: HashSet<Uuid> = [a].into_iter().collect();
        let ranked = rank_by_shared_notes(&reference, vec![parfum(vec![Uuid::new_v4()], 99)], 10);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_ranking_score_then_popularity() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let reference: HashSet<Uuid> = [a, b].into_iter().collect();

        let one_note_popular = parfum(vec![a], 100);
        let two_notes_quiet = parfum(vec![a, b], 0);
        let one_note_quiet = parfum(vec![b], 1);

        let ranked = rank_by_shared_notes(
            &reference,
            vec![
                one_note_popular.clone(),
                two_notes_quiet.clone(),
                one_note_quiet.clone(),
            ],
            10,
        );

        assert_eq!(ranked[0].parfum.id, two_notes_quiet.id);
        assert_eq!(ranked[1].parfum.id, one_note_popular.id);
        assert_eq!(ranked[2].parfum.id, one_note_quiet.id);
    }

    #[test]
    fn test_limit_truncates() {
        let a = Uuid::new_v4();
        let reference: HashSet<Uuid> = [a].into_iter().collect();
        let candidates: Vec<Parfum> = (0..20).map(|i| parfum(vec![a], i)).collect();
        let ranked = rank_by_shared_notes(&reference, candidates, 6);
        assert_eq!(ranked.len(), 6);
        // Highest popularity first among equal scores
        assert_eq!(ranked[0].parfum.popularity, 19);
    }

    #[test]
    fn test_pyramid_notes_count_toward_similarity() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut candidate = parfum(vec![], 0);
        candidate.top_note_ids = vec![a];
        candidate.base_note_ids = vec![b];

        let reference: HashSet<Uuid> = [a, b].into_iter().collect();
        let ranked = rank_by_shared_notes(&reference, vec![candidate], 10);
        assert_eq!(ranked[0].common_notes_count, 2);
        assert_eq!(ranked[0].similarity_percentage, 100);
    }
}
