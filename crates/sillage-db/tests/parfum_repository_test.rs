//! Integration tests for the perfume repository.
//!
//! Requires a migrated test database; set SILLAGE_TEST_DATABASE_URL to
//! enable (tests skip gracefully otherwise).

use sillage_core::{
    Genre, ListParfumsRequest, NotePosition, ParfumRepository, ParfumSort, UpdateParfumRequest,
};
use sillage_db::require_test_db;

#[tokio::test]
async fn test_insert_fetch_roundtrip_keeps_note_order() {
    let mut test_db = require_test_db!();

    let jasmine = test_db.create_note("Jasmin RT", NotePosition::Heart).await;
    let cedar = test_db.create_note("Cèdre RT", NotePosition::Base).await;
    let id = test_db
        .create_parfum("Roundtrip Eau", "Maison RT", vec![jasmine, cedar])
        .await;

    let fetched = test_db.db.parfums.fetch(id).await.unwrap();
    assert_eq!(fetched.name, "Roundtrip Eau");
    assert_eq!(fetched.note_ids, vec![jasmine, cedar]);
    assert_eq!(fetched.popularity, 0);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_list_genre_filter_total_matches_page() {
    let mut test_db = require_test_db!();

    let note = test_db.create_note("Vetiver LF", NotePosition::Base).await;
    for i in 0..3 {
        test_db
            .create_parfum(&format!("Listing Test {}", i), "Marque LF", vec![note])
            .await;
    }

    let page = test_db
        .db
        .parfums
        .list(ListParfumsRequest {
            search: Some("Listing Test".to_string()),
            genre: Some(Genre::Mixte),
            page: 1,
            limit: 2,
            sort_by: ParfumSort::Name,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.parfums.len(), 2);
    // Name-ascending sort
    assert!(page.parfums[0].name <= page.parfums[1].name);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_search_matches_note_name() {
    let mut test_db = require_test_db!();

    let note = test_db
        .create_note("Bergamote Unique SRCH", NotePosition::Top)
        .await;
    let id = test_db
        .create_parfum("Opaque Name", "Marque SRCH", vec![note])
        .await;

    let page = test_db
        .db
        .parfums
        .list(ListParfumsRequest {
            search: Some("Bergamote Unique SRCH".to_string()),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(page.parfums.iter().any(|p| p.id == id));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_bump_popularity_is_atomic_increment() {
    let mut test_db = require_test_db!();

    let id = test_db
        .create_parfum("Populaire", "Marque POP", vec![])
        .await;
    test_db.db.parfums.bump_popularity(id).await.unwrap();
    test_db.db.parfums.bump_popularity(id).await.unwrap();

    let fetched = test_db.db.parfums.fetch(id).await.unwrap();
    assert_eq!(fetched.popularity, 2);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_update_partial_leaves_other_fields() {
    let mut test_db = require_test_db!();

    let id = test_db
        .create_parfum("Avant Update", "Marque UP", vec![])
        .await;
    test_db
        .db
        .parfums
        .update(
            id,
            UpdateParfumRequest {
                description: Some("Nouvelle description".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let fetched = test_db.db.parfums.fetch(id).await.unwrap();
    assert_eq!(fetched.name, "Avant Update");
    assert_eq!(fetched.description.as_deref(), Some("Nouvelle description"));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_find_id_by_name_brand_is_case_insensitive() {
    let mut test_db = require_test_db!();

    let id = test_db
        .create_parfum("Casse Insensible", "Marque CI", vec![])
        .await;
    let found = test_db
        .db
        .parfums
        .find_id_by_name_brand("casse insensible", "MARQUE CI")
        .await
        .unwrap();
    assert_eq!(found, Some(id));

    test_db.cleanup().await;
}
