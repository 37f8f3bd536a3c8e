//! # sillage-core
//!
//! Core types, traits, and abstractions for the sillage perfume catalog:
//! domain models, repository traits, validation, similarity scoring,
//! configuration, and the structured-logging field schema.

pub mod config;
pub mod error;
pub mod favorites;
pub mod history;
pub mod logging;
pub mod models;
pub mod similarity;
pub mod traits;
pub mod validation;

pub use config::{Config, SmtpConfig, MAX_AVATAR_BYTES, MAX_PHOTO_BYTES};
pub use error::{Error, Result};
pub use favorites::{add_favorite, remove_favorite};
pub use history::{push_visit, HISTORY_CAP};
pub use models::*;
pub use similarity::{
    rank_by_shared_notes, reference_note_set, DEFAULT_SIMILARITY_LIMIT, MAX_REFERENCE_IDS,
    MAX_SIMILARITY_LIMIT, SIMILAR_TO_ONE_LIMIT,
};
pub use traits::*;
pub use validation::{
    clamp_pagination, parse_note_id_filter, parse_position_filter, DEFAULT_PAGE_LIMIT, FAMILIES,
    MAX_PAGE_LIMIT, MIN_SEARCH_QUERY_LEN,
};

/// Generate a new time-ordered UUIDv7 for entity ids.
pub fn new_v7() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
