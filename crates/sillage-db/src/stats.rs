//! Aggregated back-office statistics.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use sillage_core::{
    BrandCount, Error, FamilyCount, GenreCount, NoteStats, ParfumStats, PositionCount, Result,
    StatsRepository, TopParfum, UserStats,
};

/// PostgreSQL implementation of StatsRepository.
#[derive(Clone)]
pub struct PgStatsRepository {
    pool: Pool<Postgres>,
}

impl PgStatsRepository {
    /// Create a new PgStatsRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PgStatsRepository {
    async fn user_stats(&self) -> Result<UserStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
                    COUNT(*) FILTER (WHERE is_admin) AS admins, \
                    COUNT(*) FILTER (WHERE is_verified) AS verified, \
                    COUNT(*) FILTER (WHERE created_at_utc >= NOW() - INTERVAL '30 days') AS recent \
             FROM users",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(UserStats {
            total: row.try_get("total")?,
            admins: row.try_get("admins")?,
            verified: row.try_get("verified")?,
            recent: row.try_get("recent")?,
        })
    }

    async fn parfum_stats(&self) -> Result<ParfumStats> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM parfums")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .try_get("total")?;

        let by_genre = sqlx::query(
            "SELECT genre, COUNT(*) AS count FROM parfums GROUP BY genre ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .iter()
        .map(|row| {
            Ok(GenreCount {
                genre: row.try_get("genre")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let top_brands = sqlx::query(
            "SELECT brand, COUNT(*) AS count FROM parfums \
             GROUP BY brand ORDER BY count DESC, brand ASC LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .iter()
        .map(|row| {
            Ok(BrandCount {
                brand: row.try_get("brand")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let top_parfums = sqlx::query(
            "SELECT id, name, brand, popularity FROM parfums \
             ORDER BY popularity DESC, name ASC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .iter()
        .map(|row| {
            Ok(TopParfum {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                brand: row.try_get("brand")?,
                popularity: row.try_get("popularity")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(ParfumStats {
            total,
            by_genre,
            top_brands,
            top_parfums,
        })
    }

    async fn note_stats(&self) -> Result<NoteStats> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM olfactory_notes")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .try_get("total")?;

        // Canonical positions, falling back to the legacy single position
        // for notes the migration has not touched yet.
        let by_position = sqlx::query(
            "SELECT position, COUNT(*) AS count FROM ( \
                SELECT unnest(CASE \
                    WHEN cardinality(suggested_positions) > 0 THEN suggested_positions \
                    WHEN legacy_position IS NOT NULL THEN ARRAY[legacy_position] \
                    ELSE '{}'::text[] END) AS position \
                FROM olfactory_notes) AS positions \
             GROUP BY position ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .iter()
        .map(|row| {
            Ok(PositionCount {
                position: row.try_get("position")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let by_family = sqlx::query(
            "SELECT family, COUNT(*) AS count FROM olfactory_notes \
             GROUP BY family ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .iter()
        .map(|row| {
            Ok(FamilyCount {
                family: row.try_get("family")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(NoteStats {
            total,
            by_position,
            by_family,
        })
    }
}
