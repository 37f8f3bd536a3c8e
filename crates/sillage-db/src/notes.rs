//! Olfactory note repository implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use sillage_core::{
    new_v7, CreateNoteRequest, Error, ListNotesPage, ListNotesRequest, NotePosition,
    OlfactoryNote, OlfactoryNoteRepository, PositionUsage, Result, UpdateNoteRequest,
};

use crate::escape_like;

const SELECT_COLUMNS: &str = "n.id, n.name, n.description, n.legacy_position, \
     n.suggested_positions, n.position_usage, n.family, n.intensity, n.popularity, n.color, \
     n.image_url, n.synonyms, n.accord_ids, n.seasons, n.times_of_day, n.created_at_utc, \
     n.updated_at_utc";

/// SQL expression matching perfumes that reference a note in any list.
const PARFUM_REFERENCES: &str =
    "$1 = ANY(note_ids || top_note_ids || heart_note_ids || base_note_ids)";

/// PostgreSQL implementation of OlfactoryNoteRepository.
#[derive(Clone)]
pub struct PgOlfactoryNoteRepository {
    pool: Pool<Postgres>,
}

impl PgOlfactoryNoteRepository {
    /// Create a new PgOlfactoryNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn positions_to_strings(positions: &[NotePosition]) -> Vec<String> {
    positions.iter().map(|p| p.as_str().to_string()).collect()
}

fn map_row_to_note(row: &PgRow) -> Result<OlfactoryNote> {
    let legacy_raw: Option<String> = row.try_get("legacy_position")?;
    let suggested_raw: Vec<String> = row.try_get("suggested_positions")?;
    let usage: sqlx::types::Json<PositionUsage> = row.try_get("position_usage")?;

    Ok(OlfactoryNote {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        legacy_position: legacy_raw.as_deref().and_then(NotePosition::parse),
        suggested_positions: suggested_raw
            .iter()
            .filter_map(|s| NotePosition::parse(s))
            .collect(),
        position_usage: usage.0,
        family: row.try_get("family")?,
        intensity: row.try_get("intensity")?,
        popularity: row.try_get("popularity")?,
        color: row.try_get("color")?,
        image_url: row.try_get("image_url")?,
        synonyms: row.try_get("synonyms")?,
        accord_ids: row.try_get("accord_ids")?,
        seasons: row.try_get("seasons")?,
        times_of_day: row.try_get("times_of_day")?,
        created_at_utc: row.try_get("created_at_utc")?,
        updated_at_utc: row.try_get("updated_at_utc")?,
    })
}

fn map_insert_error(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return Error::Conflict("a note with this name already exists".to_string());
        }
    }
    Error::Database(e)
}

#[async_trait]
impl OlfactoryNoteRepository for PgOlfactoryNoteRepository {
    async fn insert(&self, req: CreateNoteRequest) -> Result<Uuid> {
        let id = new_v7();
        sqlx::query(
            "INSERT INTO olfactory_notes \
             (id, name, description, legacy_position, suggested_positions, family, intensity, \
              color, image_url, synonyms, accord_ids, seasons, times_of_day) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(id)
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(req.legacy_position.map(|p| p.as_str()))
        .bind(positions_to_strings(&req.suggested_positions))
        .bind(&req.family)
        .bind(req.intensity.unwrap_or(5))
        .bind(req.color.as_deref().unwrap_or("#cccccc"))
        .bind(&req.image_url)
        .bind(&req.synonyms)
        .bind(&req.accord_ids)
        .bind(&req.seasons)
        .bind(&req.times_of_day)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<OlfactoryNote> {
        let sql = format!(
            "SELECT {} FROM olfactory_notes n WHERE n.id = $1",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::NoteNotFound(id))?;
        map_row_to_note(&row)
    }

    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<OlfactoryNote>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM olfactory_notes n WHERE n.id = ANY($1)",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(map_row_to_note).collect()
    }

    async fn list(&self, req: ListNotesRequest) -> Result<ListNotesPage> {
        let mut where_clause = String::from("WHERE 1=1 ");
        let mut idx: usize = 0;

        // A note matches a position filter through the canonical list, or
        // through the legacy single position when the list is still empty.
        let position = req.position.map(|p| {
            idx += 1;
            where_clause.push_str(&format!(
                "AND (${i} = ANY(n.suggested_positions) \
                 OR (cardinality(n.suggested_positions) = 0 AND n.legacy_position = ${i})) ",
                i = idx
            ));
            p.as_str()
        });

        let search_pattern = req.search.as_deref().map(|q| {
            idx += 1;
            where_clause.push_str(&format!("AND n.name ILIKE ${} ", idx));
            format!("%{}%", escape_like(q))
        });

        let count_sql = format!(
            "SELECT COUNT(*) AS total FROM olfactory_notes n {}",
            where_clause
        );
        let mut count_query = sqlx::query(&count_sql);
        if let Some(position) = position {
            count_query = count_query.bind(position);
        }
        if let Some(pattern) = &search_pattern {
            count_query = count_query.bind(pattern);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .try_get("total")?;

        let page_sql = format!(
            "SELECT {} FROM olfactory_notes n {} ORDER BY n.name ASC LIMIT ${} OFFSET ${}",
            SELECT_COLUMNS,
            where_clause,
            idx + 1,
            idx + 2
        );
        let mut page_query = sqlx::query(&page_sql);
        if let Some(position) = position {
            page_query = page_query.bind(position);
        }
        if let Some(pattern) = &search_pattern {
            page_query = page_query.bind(pattern);
        }
        let offset = (req.page - 1) * req.limit;
        let rows = page_query
            .bind(req.limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let notes = rows
            .iter()
            .map(map_row_to_note)
            .collect::<Result<Vec<_>>>()?;
        Ok(ListNotesPage { notes, total })
    }

    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<()> {
        let mut sets = vec!["updated_at_utc = NOW()".to_string()];
        let mut idx: usize = 0;
        let mut add = |sets: &mut Vec<String>, column: &str| {
            idx += 1;
            sets.push(format!("{} = ${}", column, idx));
        };

        if req.name.is_some() {
            add(&mut sets, "name");
        }
        if req.description.is_some() {
            add(&mut sets, "description");
        }
        if req.legacy_position.is_some() {
            add(&mut sets, "legacy_position");
        }
        if req.suggested_positions.is_some() {
            add(&mut sets, "suggested_positions");
        }
        if req.family.is_some() {
            add(&mut sets, "family");
        }
        if req.intensity.is_some() {
            add(&mut sets, "intensity");
        }
        if req.color.is_some() {
            add(&mut sets, "color");
        }
        if req.image_url.is_some() {
            add(&mut sets, "image_url");
        }
        if req.synonyms.is_some() {
            add(&mut sets, "synonyms");
        }
        if req.accord_ids.is_some() {
            add(&mut sets, "accord_ids");
        }
        if req.seasons.is_some() {
            add(&mut sets, "seasons");
        }
        if req.times_of_day.is_some() {
            add(&mut sets, "times_of_day");
        }

        let sql = format!(
            "UPDATE olfactory_notes SET {} WHERE id = ${}",
            sets.join(", "),
            idx + 1
        );

        let mut query = sqlx::query(&sql);
        if let Some(v) = &req.name {
            query = query.bind(v.trim());
        }
        if let Some(v) = &req.description {
            query = query.bind(v);
        }
        if let Some(v) = req.legacy_position {
            query = query.bind(v.as_str());
        }
        if let Some(v) = &req.suggested_positions {
            query = query.bind(positions_to_strings(v));
        }
        if let Some(v) = &req.family {
            query = query.bind(v);
        }
        if let Some(v) = req.intensity {
            query = query.bind(v);
        }
        if let Some(v) = &req.color {
            query = query.bind(v);
        }
        if let Some(v) = &req.image_url {
            query = query.bind(v);
        }
        if let Some(v) = &req.synonyms {
            query = query.bind(v);
        }
        if let Some(v) = &req.accord_ids {
            query = query.bind(v);
        }
        if let Some(v) = &req.seasons {
            query = query.bind(v);
        }
        if let Some(v) = &req.times_of_day {
            query = query.bind(v);
        }

        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;
        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let sql = format!(
            "SELECT COUNT(*) AS total FROM parfums WHERE {}",
            PARFUM_REFERENCES
        );
        let referencing: i64 = sqlx::query(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?
            .try_get("total")?;
        if referencing > 0 {
            return Err(Error::InvalidInput(format!(
                "note is still referenced by {} parfum(s); remove those references first",
                referencing
            )));
        }

        // Scrub the note out of accord lists and user favorites before the
        // delete; the storage layer does not cascade.
        sqlx::query(
            "UPDATE olfactory_notes SET accord_ids = array_remove(accord_ids, $1) \
             WHERE $1 = ANY(accord_ids)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query(
            "UPDATE users SET favorite_notes = array_remove(favorite_notes, $1) \
             WHERE $1 = ANY(favorite_notes)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM olfactory_notes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn count_referencing_parfums(&self, id: Uuid) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) AS total FROM parfums WHERE {}",
            PARFUM_REFERENCES
        );
        let total: i64 = sqlx::query(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .try_get("total")?;
        Ok(total)
    }

    async fn missing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT id FROM olfactory_notes WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        let found: HashSet<Uuid> = rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<std::result::Result<_, sqlx::Error>>()?;
        Ok(ids
            .iter()
            .filter(|id| !found.contains(id))
            .copied()
            .collect())
    }

    async fn resolve_names(&self, names: &[String]) -> Result<HashMap<String, Uuid>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let lowered: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
        let rows = sqlx::query(
            "SELECT id, LOWER(name) AS lname FROM olfactory_notes WHERE LOWER(name) = ANY($1)",
        )
        .bind(&lowered)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut resolved = HashMap::new();
        for row in rows {
            let name: String = row.try_get("lname")?;
            let id: Uuid = row.try_get("id")?;
            resolved.insert(name, id);
        }
        Ok(resolved)
    }

    async fn list_all(&self) -> Result<Vec<OlfactoryNote>> {
        let sql = format!(
            "SELECT {} FROM olfactory_notes n ORDER BY n.name ASC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(map_row_to_note).collect()
    }

    async fn apply_position_migration(
        &self,
        id: Uuid,
        usage: PositionUsage,
        suggested: Vec<NotePosition>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE olfactory_notes \
             SET position_usage = $2, suggested_positions = $3, legacy_position = NULL, \
                 updated_at_utc = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(sqlx::types::Json(usage))
        .bind(positions_to_strings(&suggested))
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }
}
