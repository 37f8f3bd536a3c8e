//! User repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use sillage_core::{
    new_v7, CreateUserRequest, Error, Genre, HistoryEntry, ListUsersPage, ListUsersRequest,
    Result, UpdateProfileRequest, User, UserPreferences, UserRepository,
};

use crate::escape_like;

const SELECT_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.is_admin, \
     u.is_verified, u.reset_token, u.reset_token_expires, u.photo_path, u.favorite_parfums, \
     u.favorite_notes, u.history, u.preferred_genre, u.preferred_families, u.created_at_utc";

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_user(row: &PgRow) -> Result<User> {
    let history: sqlx::types::Json<Vec<HistoryEntry>> = row.try_get("history")?;
    let preferred_genre: Option<String> = row.try_get("preferred_genre")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
        is_verified: row.try_get("is_verified")?,
        reset_token: row.try_get("reset_token")?,
        reset_token_expires: row.try_get("reset_token_expires")?,
        photo_path: row.try_get("photo_path")?,
        favorite_parfums: row.try_get("favorite_parfums")?,
        favorite_notes: row.try_get("favorite_notes")?,
        history: history.0,
        preferences: UserPreferences {
            preferred_genre: preferred_genre.as_deref().and_then(Genre::parse),
            preferred_families: row.try_get("preferred_families")?,
        },
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

fn map_insert_error(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or_default();
            let message = if constraint.contains("email") {
                "email already registered"
            } else {
                "username already taken"
            };
            return Error::Conflict(message.to_string());
        }
    }
    Error::Database(e)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, req: CreateUserRequest) -> Result<User> {
        let id = new_v7();
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, is_verified) \
             VALUES ($1, $2, $3, $4, TRUE) \
             RETURNING {}",
            SELECT_COLUMNS.replace("u.", "users.")
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(req.username.trim())
            .bind(req.email.trim().to_lowercase())
            .bind(&req.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)?;
        map_row_to_user(&row)
    }

    async fn fetch(&self, id: Uuid) -> Result<User> {
        let sql = format!("SELECT {} FROM users u WHERE u.id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::UserNotFound(id))?;
        map_row_to_user(&row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.email = $1", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(map_row_to_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users u WHERE LOWER(u.username) = LOWER($1)",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(map_row_to_user).transpose()
    }

    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Result<()> {
        let mut sets: Vec<String> = Vec::new();
        let mut idx: usize = 0;
        let mut add = |sets: &mut Vec<String>, column: &str| {
            idx += 1;
            sets.push(format!("{} = ${}", column, idx));
        };

        if req.username.is_some() {
            add(&mut sets, "username");
        }
        if req.email.is_some() {
            add(&mut sets, "email");
        }
        if req.password_hash.is_some() {
            add(&mut sets, "password_hash");
        }
        if req.photo_path.is_some() {
            add(&mut sets, "photo_path");
        }
        if req.preferences.is_some() {
            add(&mut sets, "preferred_genre");
            idx += 1;
            sets.push(format!("preferred_families = ${}", idx));
        }

        if sets.is_empty() {
            return match self.fetch(id).await {
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
        }

        let sql = format!(
            "UPDATE users SET {} WHERE id = ${}",
            sets.join(", "),
            idx + 1
        );

        let mut query = sqlx::query(&sql);
        if let Some(v) = &req.username {
            query = query.bind(v.trim());
        }
        if let Some(v) = &req.email {
            query = query.bind(v.trim().to_lowercase());
        }
        if let Some(v) = &req.password_hash {
            query = query.bind(v);
        }
        if let Some(v) = &req.photo_path {
            query = query.bind(v);
        }
        if let Some(prefs) = &req.preferences {
            query = query
                .bind(prefs.preferred_genre.map(|g| g.as_str()))
                .bind(&prefs.preferred_families);
        }

        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_insert_error)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn mark_verified(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users u WHERE u.reset_token = $1",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(map_row_to_user).transpose()
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, reset_token = NULL, \
             reset_token_expires = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn set_favorite_parfums(&self, id: Uuid, favorites: &[Uuid]) -> Result<()> {
        let result = sqlx::query("UPDATE users SET favorite_parfums = $2 WHERE id = $1")
            .bind(id)
            .bind(favorites)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn set_favorite_notes(&self, id: Uuid, favorites: &[Uuid]) -> Result<()> {
        let result = sqlx::query("UPDATE users SET favorite_notes = $2 WHERE id = $1")
            .bind(id)
            .bind(favorites)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn set_history(&self, id: Uuid, history: &[HistoryEntry]) -> Result<()> {
        let result = sqlx::query("UPDATE users SET history = $2 WHERE id = $1")
            .bind(id)
            .bind(sqlx::types::Json(history))
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn list(&self, req: ListUsersRequest) -> Result<ListUsersPage> {
        let mut where_clause = String::from("WHERE 1=1 ");
        let search_pattern = req.search.as_deref().map(|q| {
            where_clause.push_str("AND (u.username ILIKE $1 OR u.email ILIKE $1) ");
            format!("%{}%", escape_like(q))
        });

        let count_sql = format!("SELECT COUNT(*) AS total FROM users u {}", where_clause);
        let mut count_query = sqlx::query(&count_sql);
        if let Some(pattern) = &search_pattern {
            count_query = count_query.bind(pattern);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .try_get("total")?;

        let next = if search_pattern.is_some() { 2 } else { 1 };
        let page_sql = format!(
            "SELECT {} FROM users u {} ORDER BY u.created_at_utc DESC LIMIT ${} OFFSET ${}",
            SELECT_COLUMNS,
            where_clause,
            next,
            next + 1
        );
        let mut page_query = sqlx::query(&page_sql);
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

        let users = rows
            .iter()
            .map(map_row_to_user)
            .collect::<Result<Vec<_>>>()?;
        Ok(ListUsersPage { users, total })
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_admin = $2 WHERE id = $1")
            .bind(id)
            .bind(is_admin)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users u ORDER BY u.created_at_utc ASC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(map_row_to_user).collect()
    }
}
