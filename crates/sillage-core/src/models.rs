//! Core data models for sillage.
//!
//! These types are shared across all sillage crates and represent the
//! catalog domain: perfumes, olfactory notes, and user accounts. Wire
//! serialization is camelCase to match the public JSON contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ENUMS
// =============================================================================

/// Gender category of a perfume.
///
/// Canonical wire values are the French catalog terms; the English
/// aliases are accepted on input for older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    #[serde(alias = "male")]
    Homme,
    #[serde(alias = "female")]
    Femme,
    #[serde(alias = "unisex")]
    Mixte,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Homme => "homme",
            Genre::Femme => "femme",
            Genre::Mixte => "mixte",
        }
    }

    /// Parse a genre from its wire representation (French or English).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "homme" | "male" => Some(Genre::Homme),
            "femme" | "female" => Some(Genre::Femme),
            "mixte" | "unisex" => Some(Genre::Mixte),
            _ => None,
        }
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaporation phase at which an olfactory note is perceived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotePosition {
    Top,
    Heart,
    Base,
}

impl NotePosition {
    pub const ALL: [NotePosition; 3] = [NotePosition::Top, NotePosition::Heart, NotePosition::Base];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotePosition::Top => "top",
            NotePosition::Heart => "heart",
            NotePosition::Base => "base",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "top" => Some(NotePosition::Top),
            "heart" => Some(NotePosition::Heart),
            "base" => Some(NotePosition::Base),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PERFUME TYPES
// =============================================================================

/// A merchant offering for a perfume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MerchantLink {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// A perfume catalog entry.
///
/// Note references come in two shapes: the legacy flat `note_ids` list and
/// the newer top/heart/base pyramid. Both are persisted; [`Parfum::all_note_ids`]
/// is the canonical union used for similarity and population.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parfum {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub genre: Genre,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub note_ids: Vec<Uuid>,
    pub top_note_ids: Vec<Uuid>,
    pub heart_note_ids: Vec<Uuid>,
    pub base_note_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub popularity: i64,
    pub merchant_links: Vec<MerchantLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl Parfum {
    /// Ordered, deduplicated union of the flat list and the pyramid lists.
    pub fn all_note_ids(&self) -> Vec<Uuid> {
        let mut seen = std::collections::HashSet::new();
        self.note_ids
            .iter()
            .chain(self.top_note_ids.iter())
            .chain(self.heart_note_ids.iter())
            .chain(self.base_note_ids.iter())
            .filter(|id| seen.insert(**id))
            .copied()
            .collect()
    }
}

/// Note fields projected into perfume responses.
///
/// Listing responses carry name/positions/family; detail responses add
/// the description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteProjection {
    pub id: Uuid,
    pub name: String,
    pub positions: Vec<NotePosition>,
    pub family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A perfume with its note references populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParfumWithNotes {
    #[serde(flatten)]
    pub parfum: Parfum,
    pub notes: Vec<NoteProjection>,
}

/// A similarity-ranked perfume.
#[derive(Debug, Clone)]
pub struct ScoredParfum {
    pub parfum: Parfum,
    /// Number of notes shared with the reference set.
    pub common_notes_count: usize,
    /// round(common / total_reference_notes * 100)
    pub similarity_percentage: u32,
}

// =============================================================================
// OLFACTORY NOTE TYPES
// =============================================================================

/// Per-position usage counters, recomputed by the offline migration batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionUsage {
    pub top: i64,
    pub heart: i64,
    pub base: i64,
}

impl PositionUsage {
    pub fn get(&self, position: NotePosition) -> i64 {
        match position {
            NotePosition::Top => self.top,
            NotePosition::Heart => self.heart,
            NotePosition::Base => self.base,
        }
    }

    pub fn bump(&mut self, position: NotePosition) {
        match position {
            NotePosition::Top => self.top += 1,
            NotePosition::Heart => self.heart += 1,
            NotePosition::Base => self.base += 1,
        }
    }
}

/// A named scent component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OlfactoryNote {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Legacy single-position classification. Cleared by the migration
    /// batch once `suggested_positions` is derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_position: Option<NotePosition>,
    /// Canonical position classification (positions used >= 3 times).
    pub suggested_positions: Vec<NotePosition>,
    pub position_usage: PositionUsage,
    pub family: String,
    /// 1..=10, default 5.
    pub intensity: i32,
    pub popularity: i64,
    /// Hex color used by the frontend note chips.
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub synonyms: Vec<String>,
    /// Harmonious accords: references to other notes.
    pub accord_ids: Vec<Uuid>,
    pub seasons: Vec<String>,
    pub times_of_day: Vec<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl OlfactoryNote {
    /// Positions this note is classified under, preferring the canonical
    /// list and falling back to the legacy single position.
    pub fn positions(&self) -> Vec<NotePosition> {
        if !self.suggested_positions.is_empty() {
            self.suggested_positions.clone()
        } else {
            self.legacy_position.into_iter().collect()
        }
    }

    pub fn projection(&self, with_description: bool) -> NoteProjection {
        NoteProjection {
            id: self.id,
            name: self.name.clone(),
            positions: self.positions(),
            family: self.family.clone(),
            description: if with_description {
                self.description.clone()
            } else {
                None
            },
        }
    }
}

// =============================================================================
// USER TYPES
// =============================================================================

/// A single view-history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub parfum_id: Uuid,
    pub visited_at: DateTime<Utc>,
}

/// Embedded user preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_genre: Option<Genre>,
    #[serde(default)]
    pub preferred_families: Vec<String>,
}

/// A user account as stored. Internal type: carries the password hash and
/// reset-token fields, so it is never serialized into a response — use
/// [`User::public`] for that.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub photo_path: Option<String>,
    pub favorite_parfums: Vec<Uuid>,
    pub favorite_notes: Vec<Uuid>,
    pub history: Vec<HistoryEntry>,
    pub preferences: UserPreferences,
    pub created_at_utc: DateTime<Utc>,
}

impl User {
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
            is_verified: self.is_verified,
            photo_path: self.photo_path.clone(),
            favorite_parfums: self.favorite_parfums.clone(),
            favorite_notes: self.favorite_notes.clone(),
            preferences: self.preferences.clone(),
            created_at_utc: self.created_at_utc,
        }
    }
}

/// The response-safe view of a user. No password hash, no reset token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
    pub favorite_parfums: Vec<Uuid>,
    pub favorite_notes: Vec<Uuid>,
    pub preferences: UserPreferences,
    pub created_at_utc: DateTime<Utc>,
}

// =============================================================================
// STATS TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: i64,
    pub admins: i64,
    pub verified: i64,
    /// Accounts created within the last 30 days.
    pub recent: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreCount {
    pub genre: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandCount {
    pub brand: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopParfum {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub popularity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParfumStats {
    pub total: i64,
    pub by_genre: Vec<GenreCount>,
    pub top_brands: Vec<BrandCount>,
    pub top_parfums: Vec<TopParfum>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionCount {
    pub position: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyCount {
    pub family: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub total: i64,
    pub by_position: Vec<PositionCount>,
    pub by_family: Vec<FamilyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: UserStats,
    pub parfums: ParfumStats,
    pub notes: NoteStats,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Pagination metadata for list responses.
///
/// Every list endpoint wraps its items as
/// `{ "<items>": [...], "pagination": { page, limit, total, pages } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    /// 1-based page number (request parameter)
    pub page: i64,
    /// Maximum number of items per page (request parameter)
    pub limit: i64,
    /// Total number of items matching the query (across all pages)
    pub total: i64,
    /// Total number of pages
    pub pages: i64,
}

impl PaginationMeta {
    /// Compute pagination metadata. `pages` is `ceil(total / limit)`,
    /// zero when the result set is empty.
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Outcome of a CSV import batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: u64,
    pub errors: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_parse_french_and_english() {
        assert_eq!(Genre::parse("homme"), Some(Genre::Homme));
        assert_eq!(Genre::parse("MALE"), Some(Genre::Homme));
        assert_eq!(Genre::parse("femme"), Some(Genre::Femme));
        assert_eq!(Genre::parse("unisex"), Some(Genre::Mixte));
        assert_eq!(Genre::parse("autre"), None);
    }

    #[test]
    fn test_genre_serde_aliases() {
        let g: Genre = serde_json::from_str("\"male\"").unwrap();
        assert_eq!(g, Genre::Homme);
        assert_eq!(serde_json::to_string(&g).unwrap(), "\"homme\"");
    }

    #[test]
    fn test_note_position_roundtrip() {
        for p in NotePosition::ALL {
            assert_eq!(NotePosition::parse(p.as_str()), Some(p));
        }
    }

    #[test]
    fn test_all_note_ids_union_preserves_order_and_dedups() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let parfum = sample_parfum(vec![a, b], vec![b, c], vec![], vec![a]);
        assert_eq!(parfum.all_note_ids(), vec![a, b, c]);
    }

    #[test]
    fn test_note_positions_fallback_to_legacy() {
        let mut note = sample_note();
        note.suggested_positions = vec![];
        note.legacy_position = Some(NotePosition::Base);
        assert_eq!(note.positions(), vec![NotePosition::Base]);

        note.suggested_positions = vec![NotePosition::Top, NotePosition::Heart];
        assert_eq!(
            note.positions(),
            vec![NotePosition::Top, NotePosition::Heart]
        );
    }

    #[test]
    fn test_user_public_omits_password_hash() {
        let user = sample_user();
        let value = serde_json::to_value(user.public()).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("password_hash").is_none());
        assert!(value.get("resetToken").is_none());
        assert_eq!(value["username"], "alice");
    }

    #[test]
    fn test_pagination_meta_rounds_up() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.pages, 3);
        let meta = PaginationMeta::new(2, 20, 40);
        assert_eq!(meta.pages, 2);
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.pages, 0);
    }

    fn sample_parfum(
        note_ids: Vec<Uuid>,
        top: Vec<Uuid>,
        heart: Vec<Uuid>,
        base: Vec<Uuid>,
    ) -> Parfum {
        Parfum {
            id: Uuid::new_v4(),
            name: "Nuit Ambrée".to_string(),
            brand: "Maison Test".to_string(),
            genre: Genre::Mixte,
            description: None,
            note_ids,
            top_note_ids: top,
            heart_note_ids: heart,
            base_note_ids: base,
            photo_url: None,
            popularity: 0,
            merchant_links: vec![],
            barcode: None,
            price: None,
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        }
    }

    fn sample_note() -> OlfactoryNote {
        OlfactoryNote {
            id: Uuid::new_v4(),
            name: "Jasmin".to_string(),
            description: None,
            legacy_position: None,
            suggested_positions: vec![NotePosition::Heart],
            position_usage: PositionUsage::default(),
            family: "florale".to_string(),
            intensity: 5,
            popularity: 0,
            color: "#cccccc".to_string(),
            image_url: None,
            synonyms: vec![],
            accord_ids: vec![],
            seasons: vec![],
            times_of_day: vec![],
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        }
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            is_admin: false,
            is_verified: true,
            reset_token: None,
            reset_token_expires: None,
            photo_path: None,
            favorite_parfums: vec![],
            favorite_notes: vec![],
            history: vec![],
            preferences: UserPreferences::default(),
            created_at_utc: Utc::now(),
        }
    }
}
