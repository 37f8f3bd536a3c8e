//! # sillage-db
//!
//! PostgreSQL database layer for sillage.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for perfumes, olfactory notes, and users
//! - Aggregated back-office statistics
//! - Filesystem asset storage for uploaded images
//! - The offline note-position migration batch
//!
//! Referential fields (note lists, favorites, accords) are plain `uuid[]`
//! columns with no foreign keys; referential cleanup is the caller's
//! responsibility, as in the document store this schema mirrors.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sillage_db::Database;
//! use sillage_core::{ParfumRepository, ListParfumsRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/sillage").await?;
//!     let page = db.parfums.list(ListParfumsRequest {
//!         page: 1,
//!         limit: 20,
//!         ..Default::default()
//!     }).await?;
//!     println!("{} parfums", page.total);
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod notes;
pub mod parfums;
pub mod pool;
pub mod position_migration;
pub mod stats;
pub mod users;

// Test fixtures for integration tests
// Note: always compiled so integration tests (in tests/) can use them.
pub mod test_fixtures;

// Re-export core types
pub use sillage_core::*;

// Re-export repository implementations
pub use assets::{
    extension_for_mime, AssetBackend, FilesystemAssetBackend, CATEGORY_AVATARS, CATEGORY_PARFUMS,
};
pub use notes::PgOlfactoryNoteRepository;
pub use parfums::PgParfumRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use position_migration::{
    derive_suggested, popular_positions, run_position_migration, tally_position_usage,
    MigrationReport, POPULAR_USAGE_THRESHOLD, SUGGESTED_USAGE_THRESHOLD,
};
pub use stats::PgStatsRepository;
pub use users::PgUserRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Perfume catalog repository.
    pub parfums: PgParfumRepository,
    /// Olfactory note repository.
    pub notes: PgOlfactoryNoteRepository,
    /// User account repository.
    pub users: PgUserRepository,
    /// Aggregated statistics.
    pub stats: PgStatsRepository,
}

impl Database {
    /// Build a database context over an existing pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            parfums: PgParfumRepository::new(pool.clone()),
            notes: PgOlfactoryNoteRepository::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            stats: PgStatsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_escapes_wildcards() {
        assert_eq!(escape_like("100%_\\"), "100\\%\\_\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
