//! Repository traits for sillage persistence.
//!
//! These traits define the seam between controllers and storage, enabling
//! Postgres-backed implementations in `sillage-db` and test doubles in
//! unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PERFUME REPOSITORY
// =============================================================================

/// Sort order for the perfume listing.
///
/// Wire values accept both the French catalog terms (`nom`, `marque`) and
/// their English equivalents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParfumSort {
    Name,
    Brand,
    Recent,
    #[default]
    Popularity,
}

impl ParfumSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nom" | "name" => Some(ParfumSort::Name),
            "marque" | "brand" => Some(ParfumSort::Brand),
            "recent" => Some(ParfumSort::Recent),
            "popularity" | "popularite" => Some(ParfumSort::Popularity),
            _ => None,
        }
    }
}

/// Request for the perfume list/filter endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListParfumsRequest {
    /// Free-text search over name/brand/description and note names.
    pub search: Option<String>,
    pub genre: Option<Genre>,
    /// Perfumes must reference all of these notes.
    pub note_ids: Vec<Uuid>,
    /// 1-based page number.
    pub page: i64,
    pub limit: i64,
    pub sort_by: ParfumSort,
}

/// One page of perfumes plus the unpaginated match count.
#[derive(Debug, Clone)]
pub struct ListParfumsPage {
    pub parfums: Vec<Parfum>,
    pub total: i64,
}

/// Request for the specialized search endpoint.
#[derive(Debug, Clone)]
pub struct SearchParfumsRequest {
    pub query: String,
    pub genre: Option<Genre>,
    pub brand: Option<String>,
    pub limit: i64,
}

/// Request for creating a perfume.
#[derive(Debug, Clone)]
pub struct CreateParfumRequest {
    pub name: String,
    pub brand: String,
    pub genre: Genre,
    pub description: Option<String>,
    pub note_ids: Vec<Uuid>,
    pub top_note_ids: Vec<Uuid>,
    pub heart_note_ids: Vec<Uuid>,
    pub base_note_ids: Vec<Uuid>,
    pub photo_url: Option<String>,
    pub merchant_links: Vec<MerchantLink>,
    pub barcode: Option<String>,
    pub price: Option<f64>,
}

/// Partial update of a perfume. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateParfumRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub genre: Option<Genre>,
    pub description: Option<String>,
    pub note_ids: Option<Vec<Uuid>>,
    pub top_note_ids: Option<Vec<Uuid>>,
    pub heart_note_ids: Option<Vec<Uuid>>,
    pub base_note_ids: Option<Vec<Uuid>>,
    pub photo_url: Option<String>,
    pub merchant_links: Option<Vec<MerchantLink>>,
    pub barcode: Option<String>,
    pub price: Option<f64>,
}

impl UpdateParfumRequest {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.brand.is_none()
            && self.genre.is_none()
            && self.description.is_none()
            && self.note_ids.is_none()
            && self.top_note_ids.is_none()
            && self.heart_note_ids.is_none()
            && self.base_note_ids.is_none()
            && self.photo_url.is_none()
            && self.merchant_links.is_none()
            && self.barcode.is_none()
            && self.price.is_none()
    }

    /// All note ids referenced by the update, for referential validation.
    pub fn referenced_note_ids(&self) -> Vec<Uuid> {
        let mut seen = std::collections::HashSet::new();
        self.note_ids
            .iter()
            .chain(self.top_note_ids.iter())
            .chain(self.heart_note_ids.iter())
            .chain(self.base_note_ids.iter())
            .flatten()
            .filter(|id| seen.insert(**id))
            .copied()
            .collect()
    }
}

/// Repository for perfume CRUD and query operations.
#[async_trait]
pub trait ParfumRepository: Send + Sync {
    /// Insert a new perfume.
    async fn insert(&self, req: CreateParfumRequest) -> Result<Uuid>;

    /// Fetch a perfume by id.
    async fn fetch(&self, id: Uuid) -> Result<Parfum>;

    /// Fetch several perfumes by id; missing ids are skipped.
    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<Parfum>>;

    /// List perfumes with filtering, sorting, and pagination.
    async fn list(&self, req: ListParfumsRequest) -> Result<ListParfumsPage>;

    /// Specialized text search, popularity-ranked.
    async fn search(&self, req: SearchParfumsRequest) -> Result<Vec<Parfum>>;

    /// Partially update a perfume.
    async fn update(&self, id: Uuid, req: UpdateParfumRequest) -> Result<()>;

    /// Hard-delete a perfume. Does not cascade into favorites/history.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Check existence by id.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Atomic, storage-layer popularity increment.
    async fn bump_popularity(&self, id: Uuid) -> Result<()>;

    /// Perfumes referencing at least one of the given notes, excluding ids.
    async fn sharing_any_note(&self, note_ids: &[Uuid], exclude: &[Uuid]) -> Result<Vec<Parfum>>;

    /// Lookup by the (name, brand) composite key used for CSV upserts.
    async fn find_id_by_name_brand(&self, name: &str, brand: &str) -> Result<Option<Uuid>>;

    /// Every perfume, for CSV export and the migration batch.
    async fn list_all(&self) -> Result<Vec<Parfum>>;
}

// =============================================================================
// OLFACTORY NOTE REPOSITORY
// =============================================================================

/// Request for the note listing.
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// Filter by classified position.
    pub position: Option<NotePosition>,
    /// Name-substring search.
    pub search: Option<String>,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ListNotesPage {
    pub notes: Vec<OlfactoryNote>,
    pub total: i64,
}

/// Request for creating an olfactory note.
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub name: String,
    pub description: Option<String>,
    pub legacy_position: Option<NotePosition>,
    pub suggested_positions: Vec<NotePosition>,
    pub family: String,
    pub intensity: Option<i32>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub synonyms: Vec<String>,
    pub accord_ids: Vec<Uuid>,
    pub seasons: Vec<String>,
    pub times_of_day: Vec<String>,
}

/// Partial update of a note. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateNoteRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub legacy_position: Option<NotePosition>,
    pub suggested_positions: Option<Vec<NotePosition>>,
    pub family: Option<String>,
    pub intensity: Option<i32>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub synonyms: Option<Vec<String>>,
    pub accord_ids: Option<Vec<Uuid>>,
    pub seasons: Option<Vec<String>>,
    pub times_of_day: Option<Vec<String>>,
}

/// Repository for olfactory note CRUD operations.
#[async_trait]
pub trait OlfactoryNoteRepository: Send + Sync {
    /// Insert a new note. Name is unique.
    async fn insert(&self, req: CreateNoteRequest) -> Result<Uuid>;

    /// Fetch a note by id.
    async fn fetch(&self, id: Uuid) -> Result<OlfactoryNote>;

    /// Fetch several notes by id; missing ids are skipped.
    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<OlfactoryNote>>;

    /// List notes with position filter, name search, and pagination.
    async fn list(&self, req: ListNotesRequest) -> Result<ListNotesPage>;

    /// Partially update a note.
    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<()>;

    /// Delete a note.
    ///
    /// Fails with `InvalidInput` naming the referencing-perfume count when
    /// any perfume still references the note. On success the note id is
    /// also scrubbed from other notes' accord lists and user favorites.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Number of perfumes whose note lists reference this note.
    async fn count_referencing_parfums(&self, id: Uuid) -> Result<i64>;

    /// Subset of `ids` that do not exist, for referential validation.
    async fn missing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// Case-insensitive name → id resolution for CSV import.
    async fn resolve_names(&self, names: &[String]) -> Result<HashMap<String, Uuid>>;

    /// Every note, for the migration batch.
    async fn list_all(&self) -> Result<Vec<OlfactoryNote>>;

    /// Persist the recomputed position usage for one note and clear the
    /// legacy single-position field.
    async fn apply_position_migration(
        &self,
        id: Uuid,
        usage: PositionUsage,
        suggested: Vec<NotePosition>,
    ) -> Result<()>;
}

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Request for creating a user. The password arrives already hashed: the
/// hashing step is an explicit part of the registration write path, not a
/// persistence hook.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    /// Stored lowercase.
    pub email: String,
    pub password_hash: String,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub preferences: Option<UserPreferences>,
    pub photo_path: Option<String>,
}

/// Request for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct ListUsersRequest {
    /// Username/email substring search.
    pub search: Option<String>,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ListUsersPage {
    pub users: Vec<User>,
    pub total: i64,
}

/// Repository for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and return the stored row.
    async fn insert(&self, req: CreateUserRequest) -> Result<User>;

    /// Fetch a user by id.
    async fn fetch(&self, id: Uuid) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Partially update profile fields.
    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Result<()>;

    /// Flip the verified flag on (email-verification stub).
    async fn mark_verified(&self, id: Uuid) -> Result<()>;

    /// Store a password-reset token and its expiry.
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>>;

    /// Replace the password hash and clear the reset-token fields.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()>;

    /// Delete the account. No cascade.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Replace the favorite-perfume list (read-modify-write model).
    async fn set_favorite_parfums(&self, id: Uuid, favorites: &[Uuid]) -> Result<()>;

    /// Replace the favorite-note list.
    async fn set_favorite_notes(&self, id: Uuid, favorites: &[Uuid]) -> Result<()>;

    /// Replace the view history.
    async fn set_history(&self, id: Uuid, history: &[HistoryEntry]) -> Result<()>;

    /// Admin listing with substring search.
    async fn list(&self, req: ListUsersRequest) -> Result<ListUsersPage>;

    /// Set the admin flag.
    async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<()>;

    /// Every user, for CSV export.
    async fn list_all(&self) -> Result<Vec<User>>;
}

// =============================================================================
// STATS REPOSITORY
// =============================================================================

/// Aggregated back-office statistics.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn user_stats(&self) -> Result<UserStats>;
    async fn parfum_stats(&self) -> Result<ParfumStats>;
    async fn note_stats(&self) -> Result<NoteStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parfum_sort_aliases() {
        assert_eq!(ParfumSort::parse("nom"), Some(ParfumSort::Name));
        assert_eq!(ParfumSort::parse("name"), Some(ParfumSort::Name));
        assert_eq!(ParfumSort::parse("marque"), Some(ParfumSort::Brand));
        assert_eq!(ParfumSort::parse("RECENT"), Some(ParfumSort::Recent));
        assert_eq!(ParfumSort::parse("popularity"), Some(ParfumSort::Popularity));
        assert_eq!(ParfumSort::parse("unknown"), None);
    }

    #[test]
    fn test_update_parfum_request_is_empty() {
        assert!(UpdateParfumRequest::default().is_empty());
        let req = UpdateParfumRequest {
            name: Some("Eau Vive".to_string()),
            ..Default::default()
        };
        assert!(!req.is_empty());
    }

    #[test]
    fn test_referenced_note_ids_dedups_across_lists() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let req = UpdateParfumRequest {
            note_ids: Some(vec![a]),
            top_note_ids: Some(vec![a, b]),
            ..Default::default()
        };
        assert_eq!(req.referenced_note_ids(), vec![a, b]);
    }
}
