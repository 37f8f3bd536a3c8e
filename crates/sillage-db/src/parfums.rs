//! Perfume repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use sillage_core::{
    new_v7, CreateParfumRequest, Error, Genre, ListParfumsPage, ListParfumsRequest, MerchantLink,
    Parfum, ParfumRepository, ParfumSort, Result, SearchParfumsRequest, UpdateParfumRequest,
};

use crate::escape_like;

/// SQL expression for the union of the flat note list and the pyramid lists.
const ALL_NOTES: &str = "(p.note_ids || p.top_note_ids || p.heart_note_ids || p.base_note_ids)";

const SELECT_COLUMNS: &str = "p.id, p.name, p.brand, p.genre, p.description, p.note_ids, \
     p.top_note_ids, p.heart_note_ids, p.base_note_ids, p.photo_url, p.popularity, \
     p.merchant_links, p.barcode, p.price, p.created_at_utc, p.updated_at_utc";

/// PostgreSQL implementation of ParfumRepository.
#[derive(Clone)]
pub struct PgParfumRepository {
    pool: Pool<Postgres>,
}

impl PgParfumRepository {
    /// Create a new PgParfumRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_parfum(row: &PgRow) -> Result<Parfum> {
    let genre_raw: String = row.try_get("genre")?;
    let genre = Genre::parse(&genre_raw)
        .ok_or_else(|| Error::Serialization(format!("unknown genre '{}' in storage", genre_raw)))?;
    let merchant_links: sqlx::types::Json<Vec<MerchantLink>> = row.try_get("merchant_links")?;

    Ok(Parfum {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        brand: row.try_get("brand")?,
        genre,
        description: row.try_get("description")?,
        note_ids: row.try_get("note_ids")?,
        top_note_ids: row.try_get("top_note_ids")?,
        heart_note_ids: row.try_get("heart_note_ids")?,
        base_note_ids: row.try_get("base_note_ids")?,
        photo_url: row.try_get("photo_url")?,
        popularity: row.try_get("popularity")?,
        merchant_links: merchant_links.0,
        barcode: row.try_get("barcode")?,
        price: row.try_get("price")?,
        created_at_utc: row.try_get("created_at_utc")?,
        updated_at_utc: row.try_get("updated_at_utc")?,
    })
}

fn order_clause(sort: ParfumSort) -> &'static str {
    match sort {
        ParfumSort::Name => "p.name ASC, p.id ASC",
        ParfumSort::Brand => "p.brand ASC, p.name ASC",
        ParfumSort::Recent => "p.created_at_utc DESC, p.id DESC",
        ParfumSort::Popularity => "p.popularity DESC, p.name ASC",
    }
}

/// Translate a unique-constraint violation into a domain conflict.
fn map_insert_error(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or_default();
            let message = if constraint.contains("barcode") {
                "a parfum with this barcode already exists"
            } else {
                "a parfum with this name and brand already exists"
            };
            return Error::Conflict(message.to_string());
        }
    }
    Error::Database(e)
}

#[async_trait]
impl ParfumRepository for PgParfumRepository {
    async fn insert(&self, req: CreateParfumRequest) -> Result<Uuid> {
        let id = new_v7();
        sqlx::query(
            "INSERT INTO parfums \
             (id, name, brand, genre, description, note_ids, top_note_ids, heart_note_ids, \
              base_note_ids, photo_url, merchant_links, barcode, price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(id)
        .bind(req.name.trim())
        .bind(req.brand.trim())
        .bind(req.genre.as_str())
        .bind(&req.description)
        .bind(&req.note_ids)
        .bind(&req.top_note_ids)
        .bind(&req.heart_note_ids)
        .bind(&req.base_note_ids)
        .bind(&req.photo_url)
        .bind(sqlx::types::Json(&req.merchant_links))
        .bind(&req.barcode)
        .bind(req.price)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<Parfum> {
        let sql = format!("SELECT {} FROM parfums p WHERE p.id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::ParfumNotFound(id))?;
        map_row_to_parfum(&row)
    }

    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<Parfum>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM parfums p WHERE p.id = ANY($1)",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(map_row_to_parfum).collect()
    }

    async fn list(&self, req: ListParfumsRequest) -> Result<ListParfumsPage> {
        let mut where_clause = String::from("WHERE 1=1 ");
        let mut idx: usize = 0;

        let search_pattern = req.search.as_deref().map(|q| {
            idx += 1;
            where_clause.push_str(&format!(
                "AND (p.name ILIKE ${i} OR p.brand ILIKE ${i} OR p.description ILIKE ${i} \
                 OR EXISTS (SELECT 1 FROM olfactory_notes o \
                            WHERE o.id = ANY({notes}) AND o.name ILIKE ${i})) ",
                i = idx,
                notes = ALL_NOTES
            ));
            format!("%{}%", escape_like(q))
        });

        let genre = req.genre.map(|g| {
            idx += 1;
            where_clause.push_str(&format!("AND p.genre = ${} ", idx));
            g.as_str()
        });

        let note_filter = if req.note_ids.is_empty() {
            None
        } else {
            idx += 1;
            where_clause.push_str(&format!("AND {} @> ${}::uuid[] ", ALL_NOTES, idx));
            Some(&req.note_ids)
        };

        // Count under the same filter, then fetch the page.
        let count_sql = format!("SELECT COUNT(*) AS total FROM parfums p {}", where_clause);
        let mut count_query = sqlx::query(&count_sql);
        if let Some(pattern) = &search_pattern {
            count_query = count_query.bind(pattern);
        }
        if let Some(genre) = genre {
            count_query = count_query.bind(genre);
        }
        if let Some(notes) = note_filter {
            count_query = count_query.bind(notes);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .try_get("total")?;

        let page_sql = format!(
            "SELECT {} FROM parfums p {} ORDER BY {} LIMIT ${} OFFSET ${}",
            SELECT_COLUMNS,
            where_clause,
            order_clause(req.sort_by),
            idx + 1,
            idx + 2
        );
        let mut page_query = sqlx::query(&page_sql);
        if let Some(pattern) = &search_pattern {
            page_query = page_query.bind(pattern);
        }
        if let Some(genre) = genre {
            page_query = page_query.bind(genre);
        }
        if let Some(notes) = note_filter {
            page_query = page_query.bind(notes);
        }
        let offset = (req.page - 1) * req.limit;
        let rows = page_query
            .bind(req.limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let parfums = rows
            .iter()
            .map(map_row_to_parfum)
            .collect::<Result<Vec<_>>>()?;
        Ok(ListParfumsPage { parfums, total })
    }

    async fn search(&self, req: SearchParfumsRequest) -> Result<Vec<Parfum>> {
        let pattern = format!("%{}%", escape_like(&req.query));
        let mut sql = format!(
            "SELECT {} FROM parfums p \
             WHERE (p.name ILIKE $1 OR p.brand ILIKE $1 OR p.description ILIKE $1 \
                    OR EXISTS (SELECT 1 FROM olfactory_notes o \
                               WHERE o.id = ANY({}) AND o.name ILIKE $1)) ",
            SELECT_COLUMNS, ALL_NOTES
        );
        let mut idx = 1;

        let genre = req.genre.map(|g| {
            idx += 1;
            sql.push_str(&format!("AND p.genre = ${} ", idx));
            g.as_str()
        });
        let brand_pattern = req.brand.as_deref().map(|b| {
            idx += 1;
            sql.push_str(&format!("AND p.brand ILIKE ${} ", idx));
            format!("%{}%", escape_like(b))
        });

        sql.push_str(&format!(
            "ORDER BY p.popularity DESC, p.name ASC LIMIT ${}",
            idx + 1
        ));

        let mut query = sqlx::query(&sql).bind(&pattern);
        if let Some(genre) = genre {
            query = query.bind(genre);
        }
        if let Some(brand) = &brand_pattern {
            query = query.bind(brand);
        }
        let rows = query
            .bind(req.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(map_row_to_parfum).collect()
    }

    async fn update(&self, id: Uuid, req: UpdateParfumRequest) -> Result<()> {
        if req.is_empty() {
            // Nothing to change; still verify the target exists.
            return match self.exists(id).await? {
                true => Ok(()),
                false => Err(Error::ParfumNotFound(id)),
            };
        }

        let mut sets = vec!["updated_at_utc = NOW()".to_string()];
        let mut idx: usize = 0;
        let mut push = |sets: &mut Vec<String>, column: &str| {
            idx += 1;
            sets.push(format!("{} = ${}", column, idx));
            idx
        };

        if req.name.is_some() {
            push(&mut sets, "name");
        }
        if req.brand.is_some() {
            push(&mut sets, "brand");
        }
        if req.genre.is_some() {
            push(&mut sets, "genre");
        }
        if req.description.is_some() {
            push(&mut sets, "description");
        }
        if req.note_ids.is_some() {
            push(&mut sets, "note_ids");
        }
        if req.top_note_ids.is_some() {
            push(&mut sets, "top_note_ids");
        }
        if req.heart_note_ids.is_some() {
            push(&mut sets, "heart_note_ids");
        }
        if req.base_note_ids.is_some() {
            push(&mut sets, "base_note_ids");
        }
        if req.photo_url.is_some() {
            push(&mut sets, "photo_url");
        }
        if req.merchant_links.is_some() {
            push(&mut sets, "merchant_links");
        }
        if req.barcode.is_some() {
            push(&mut sets, "barcode");
        }
        if req.price.is_some() {
            push(&mut sets, "price");
        }

        let sql = format!(
            "UPDATE parfums SET {} WHERE id = ${}",
            sets.join(", "),
            idx + 1
        );

        let mut query = sqlx::query(&sql);
        if let Some(v) = &req.name {
            query = query.bind(v.trim());
        }
        if let Some(v) = &req.brand {
            query = query.bind(v.trim());
        }
        if let Some(v) = req.genre {
            query = query.bind(v.as_str());
        }
        if let Some(v) = &req.description {
            query = query.bind(v);
        }
        if let Some(v) = &req.note_ids {
            query = query.bind(v);
        }
        if let Some(v) = &req.top_note_ids {
            query = query.bind(v);
        }
        if let Some(v) = &req.heart_note_ids {
            query = query.bind(v);
        }
        if let Some(v) = &req.base_note_ids {
            query = query.bind(v);
        }
        if let Some(v) = &req.photo_url {
            query = query.bind(v);
        }
        if let Some(v) = &req.merchant_links {
            query = query.bind(sqlx::types::Json(v));
        }
        if let Some(v) = &req.barcode {
            query = query.bind(v);
        }
        if let Some(v) = req.price {
            query = query.bind(v);
        }

        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;
        if result.rows_affected() == 0 {
            return Err(Error::ParfumNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM parfums WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::ParfumNotFound(id));
        }
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM parfums WHERE id = $1) AS found")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.try_get("found")?)
    }

    async fn bump_popularity(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE parfums SET popularity = popularity + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn sharing_any_note(&self, note_ids: &[Uuid], exclude: &[Uuid]) -> Result<Vec<Parfum>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM parfums p \
             WHERE {} && $1::uuid[] AND NOT (p.id = ANY($2::uuid[]))",
            SELECT_COLUMNS, ALL_NOTES
        );
        let rows = sqlx::query(&sql)
            .bind(note_ids)
            .bind(exclude)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(map_row_to_parfum).collect()
    }

    async fn find_id_by_name_brand(&self, name: &str, brand: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query(
            "SELECT id FROM parfums WHERE LOWER(name) = LOWER($1) AND LOWER(brand) = LOWER($2)",
        )
        .bind(name.trim())
        .bind(brand.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(match row {
            Some(row) => Some(row.try_get("id")?),
            None => None,
        })
    }

    async fn list_all(&self) -> Result<Vec<Parfum>> {
        let sql = format!(
            "SELECT {} FROM parfums p ORDER BY p.name ASC, p.brand ASC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(map_row_to_parfum).collect()
    }
}
