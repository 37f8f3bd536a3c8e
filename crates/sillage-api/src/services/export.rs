//! CSV export for perfumes and users.

use std::collections::HashMap;

use uuid::Uuid;

use sillage_core::{OlfactoryNoteRepository, Parfum, ParfumRepository, User, UserRepository};
use sillage_db::Database;

use crate::error::ApiError;

/// Fixed column set of the perfume export.
pub const PARFUM_COLUMNS: [&str; 8] = [
    "name",
    "brand",
    "genre",
    "description",
    "notes",
    "popularity",
    "price",
    "created_at",
];

/// Fixed column set of the user export.
pub const USER_COLUMNS: [&str; 6] = [
    "username",
    "email",
    "created_at",
    "is_admin",
    "favorites",
    "history",
];

/// Encode perfumes as CSV. Note references are flattened into a
/// comma-joined list of note names; dangling references are skipped.
pub fn encode_parfums(
    parfums: &[Parfum],
    note_names: &HashMap<Uuid, String>,
) -> Result<Vec<u8>, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(PARFUM_COLUMNS)
        .map_err(csv_error)?;

    for parfum in parfums {
        let notes = parfum
            .all_note_ids()
            .iter()
            .filter_map(|id| note_names.get(id).cloned())
            .collect::<Vec<_>>()
            .join(",");
        writer
            .write_record([
                parfum.name.as_str(),
                parfum.brand.as_str(),
                parfum.genre.as_str(),
                parfum.description.as_deref().unwrap_or(""),
                notes.as_str(),
                parfum.popularity.to_string().as_str(),
                parfum
                    .price
                    .map(|p| p.to_string())
                    .unwrap_or_default()
                    .as_str(),
                parfum.created_at_utc.to_rfc3339().as_str(),
            ])
            .map_err(csv_error)?;
    }

    writer.into_inner().map_err(|e| {
        ApiError::Internal(sillage_core::Error::Internal(format!(
            "csv writer flush: {}",
            e
        )))
    })
}

/// Encode users as CSV: identity, join date, role, and collection sizes.
/// Never includes password material.
pub fn encode_users(users: &[User]) -> Result<Vec<u8>, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(USER_COLUMNS).map_err(csv_error)?;

    for user in users {
        let favorites = user.favorite_parfums.len() + user.favorite_notes.len();
        writer
            .write_record([
                user.username.as_str(),
                user.email.as_str(),
                user.created_at_utc.to_rfc3339().as_str(),
                if user.is_admin { "true" } else { "false" },
                favorites.to_string().as_str(),
                user.history.len().to_string().as_str(),
            ])
            .map_err(csv_error)?;
    }

    writer.into_inner().map_err(|e| {
        ApiError::Internal(sillage_core::Error::Internal(format!(
            "csv writer flush: {}",
            e
        )))
    })
}

/// Export the full perfume catalog.
pub async fn parfums_csv(db: &Database) -> Result<Vec<u8>, ApiError> {
    let parfums = db.parfums.list_all().await?;

    let mut ids: Vec<Uuid> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for parfum in &parfums {
        for id in parfum.all_note_ids() {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    let note_names: HashMap<Uuid, String> = db
        .notes
        .fetch_many(&ids)
        .await?
        .into_iter()
        .map(|note| (note.id, note.name))
        .collect();

    encode_parfums(&parfums, &note_names)
}

/// Export all user accounts.
pub async fn users_csv(db: &Database) -> Result<Vec<u8>, ApiError> {
    let users = db.users.list_all().await?;
    encode_users(&users)
}

fn csv_error(e: csv::Error) -> ApiError {
    ApiError::Internal(sillage_core::Error::Internal(format!("csv encode: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sillage_core::{Genre, HistoryEntry, UserPreferences};

    fn parfum(name: &str, notes: Vec<Uuid>) -> Parfum {
        Parfum {
            id: Uuid::new_v4(),
            name: name.to_string(),
            brand: "Maison".to_string(),
            genre: Genre::Femme,
            description: Some("Une description".to_string()),
            note_ids: notes,
            top_note_ids: vec![],
            heart_note_ids: vec![],
            base_note_ids: vec![],
            photo_url: None,
            popularity: 7,
            merchant_links: vec![],
            barcode: None,
            price: Some(89.5),
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        }
    }

    #[test]
    fn test_encode_parfums_flattens_note_names() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let dangling = Uuid::new_v4();
        let names: HashMap<Uuid, String> = [
            (a, "Jasmin".to_string()),
            (b, "Cèdre".to_string()),
        ]
        .into_iter()
        .collect();

        let data = encode_parfums(&[parfum("Nuit", vec![a, b, dangling])], &names).unwrap();
        let text = String::from_utf8(data).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "name,brand,genre,description,notes,popularity,price,created_at"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("Nuit,Maison,femme,Une description,"));
        assert!(row.contains("\"Jasmin,Cèdre\""));
        assert!(row.contains(",7,89.5,"));
    }

    #[test]
    fn test_encode_users_counts_and_no_password() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "SECRET-HASH".to_string(),
            is_admin: true,
            is_verified: true,
            reset_token: None,
            reset_token_expires: None,
            photo_path: None,
            favorite_parfums: vec![Uuid::new_v4(), Uuid::new_v4()],
            favorite_notes: vec![Uuid::new_v4()],
            history: vec![HistoryEntry {
                parfum_id: Uuid::new_v4(),
                visited_at: Utc::now(),
            }],
            preferences: UserPreferences::default(),
            created_at_utc: Utc::now(),
        };

        let data = encode_users(&[user]).unwrap();
        let text = String::from_utf8(data).unwrap();
        assert!(text.contains("alice,alice@example.com"));
        assert!(text.contains(",true,3,1"));
        assert!(!text.contains("SECRET-HASH"));
    }
}
