//! Integration tests for olfactory-note deletion and referential cleanup.
//!
//! Requires a migrated test database; set SILLAGE_TEST_DATABASE_URL to
//! enable (tests skip gracefully otherwise).

use sillage_core::{
    Error, NotePosition, OlfactoryNoteRepository, UpdateNoteRequest, UserRepository,
};
use sillage_db::require_test_db;

#[tokio::test]
async fn test_delete_blocked_while_referenced_mentions_count() {
    let mut test_db = require_test_db!();

    let note = test_db.create_note("Bloquée DEL", NotePosition::Top).await;
    for i in 0..3 {
        test_db
            .create_parfum(&format!("Référant {}", i), "Marque DEL", vec![note])
            .await;
    }

    let err = test_db.db.notes.delete(note).await.unwrap_err();
    match err {
        Error::InvalidInput(message) => assert!(message.contains('3'), "got: {}", message),
        other => panic!("expected InvalidInput, got {:?}", other),
    }

    // Still present.
    assert!(test_db.db.notes.fetch(note).await.is_ok());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_delete_unreferenced_note_scrubs_accords_and_favorites() {
    let mut test_db = require_test_db!();

    let doomed = test_db.create_note("Éphémère DEL", NotePosition::Heart).await;
    let keeper = test_db.create_note("Gardée DEL", NotePosition::Heart).await;

    // keeper lists doomed as a harmonious accord
    test_db
        .db
        .notes
        .update(
            keeper,
            UpdateNoteRequest {
                accord_ids: Some(vec![doomed]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // a user favorites doomed
    let user = test_db.create_user("scrubuser", "scrub@example.com").await;
    test_db
        .db
        .users
        .set_favorite_notes(user.id, &[doomed])
        .await
        .unwrap();

    test_db.db.notes.delete(doomed).await.unwrap();

    match test_db.db.notes.fetch(doomed).await {
        Err(Error::NoteNotFound(_)) => {}
        other => panic!("expected NoteNotFound, got {:?}", other.err()),
    }

    let keeper_after = test_db.db.notes.fetch(keeper).await.unwrap();
    assert!(keeper_after.accord_ids.is_empty());

    let user_after = test_db.db.users.fetch(user.id).await.unwrap();
    assert!(user_after.favorite_notes.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_note_name_conflicts() {
    let mut test_db = require_test_db!();

    test_db.create_note("Unique Nom CONF", NotePosition::Top).await;
    let err = test_db
        .db
        .notes
        .insert(sillage_core::CreateNoteRequest {
            name: "unique nom conf".to_string(),
            description: None,
            legacy_position: None,
            suggested_positions: vec![],
            family: "florale".to_string(),
            intensity: None,
            color: None,
            image_url: None,
            synonyms: vec![],
            accord_ids: vec![],
            seasons: vec![],
            times_of_day: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    test_db.cleanup().await;
}
