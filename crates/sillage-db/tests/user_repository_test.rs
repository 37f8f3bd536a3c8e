//! Integration tests for the user repository.
//!
//! Requires a migrated test database; set SILLAGE_TEST_DATABASE_URL to
//! enable (tests skip gracefully otherwise).

use chrono::{Duration, Utc};
use sillage_core::{Error, HistoryEntry, ListUsersRequest, UserRepository};
use sillage_db::require_test_db;
use uuid::Uuid;

#[tokio::test]
async fn test_insert_normalizes_email_and_autoverifies() {
    let mut test_db = require_test_db!();

    let user = test_db
        .create_user("casemix", "CaseMix@Example.COM")
        .await;
    assert_eq!(user.email, "casemix@example.com");
    assert!(user.is_verified);
    assert!(!user.is_admin);

    let found = test_db
        .db
        .users
        .find_by_email("casemix@example.com")
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let mut test_db = require_test_db!();

    test_db.create_user("dupone", "dup@example.com").await;
    let err = test_db
        .db
        .users
        .insert(sillage_core::CreateUserRequest {
            username: "duptwo".to_string(),
            email: "DUP@example.com".to_string(),
            password_hash: "$argon2id$x".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_history_persists_in_order() {
    let mut test_db = require_test_db!();

    let user = test_db.create_user("historian", "hist@example.com").await;
    let newest = Uuid::new_v4();
    let older = Uuid::new_v4();
    let history = vec![
        HistoryEntry {
            parfum_id: newest,
            visited_at: Utc::now(),
        },
        HistoryEntry {
            parfum_id: older,
            visited_at: Utc::now() - Duration::hours(1),
        },
    ];
    test_db
        .db
        .users
        .set_history(user.id, &history)
        .await
        .unwrap();

    let fetched = test_db.db.users.fetch(user.id).await.unwrap();
    assert_eq!(fetched.history.len(), 2);
    assert_eq!(fetched.history[0].parfum_id, newest);
    assert_eq!(fetched.history[1].parfum_id, older);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_reset_token_lookup_and_clear_on_password_update() {
    let mut test_db = require_test_db!();

    let user = test_db.create_user("resetter", "reset@example.com").await;
    test_db
        .db
        .users
        .set_reset_token(user.id, "deadbeef", Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    let found = test_db
        .db
        .users
        .find_by_reset_token("deadbeef")
        .await
        .unwrap()
        .expect("token should resolve");
    assert_eq!(found.id, user.id);

    test_db
        .db
        .users
        .update_password(user.id, "$argon2id$new")
        .await
        .unwrap();

    let after = test_db.db.users.fetch(user.id).await.unwrap();
    assert!(after.reset_token.is_none());
    assert!(after.reset_token_expires.is_none());
    assert_eq!(after.password_hash, "$argon2id$new");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_admin_listing_searches_username_and_email() {
    let mut test_db = require_test_db!();

    test_db
        .create_user("needleuser", "needle@example.com")
        .await;
    test_db.create_user("otherone", "other@example.com").await;

    let page = test_db
        .db
        .users
        .list(ListUsersRequest {
            search: Some("needle".to_string()),
            page: 1,
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.users[0].username, "needleuser");

    test_db.cleanup().await;
}
