//! User account, auth, favorites, and history handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use sillage_auth::{generate_reset_token, reset_token_expiry};
use sillage_core::{
    add_favorite, push_visit, remove_favorite, validation, CreateUserRequest,
    OlfactoryNoteRepository, PaginationMeta, Parfum, ParfumRepository, UpdateProfileRequest,
    UserPreferences, UserPublic, UserRepository,
};
use sillage_db::{extension_for_mime, CATEGORY_AVATARS};
use sillage_mail::password_reset_email;

use crate::error::ApiError;
use crate::handlers::{parse_id, PageQuery};
use crate::middleware::SessionUser;
use crate::state::AppState;

/// Identical message for unknown email and wrong password, so responses
/// cannot be used to enumerate accounts.
const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Mismatch-shaped hash verified when the email does not resolve, keeping
/// the failure path's timing close to a real verification.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

// =============================================================================
// REGISTRATION / LOGIN
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
}

/// POST /users/register
///
/// Accounts are auto-verified in the current build; the email
/// verification endpoint is a stub kept for the frontend flow.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_username(&body.username).map_err(ApiError::from)?;
    validation::validate_email(&body.email).map_err(ApiError::from)?;
    validation::validate_password(&body.password).map_err(ApiError::from)?;

    let email = body.email.trim().to_lowercase();
    if state.db.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".to_string()));
    }
    if state
        .db
        .users
        .find_by_username(&body.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("username already taken".to_string()));
    }

    let password_hash = sillage_auth::hash_password(&body.password)?;
    let user = state
        .db
        .users
        .insert(CreateUserRequest {
            username: body.username.trim().to_string(),
            email,
            password_hash,
        })
        .await?;

    info!(
        subsystem = "api",
        op = "register",
        user_id = %user.id,
        "User registered"
    );

    let token = state.tokens.issue(user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.public(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// POST /users/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state.db.users.find_by_email(&body.email).await?;

    let Some(user) = user else {
        // Burn a verification anyway so the miss is not observably faster.
        let _ = sillage_auth::verify_password(&body.password, DUMMY_HASH);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let valid = sillage_auth::verify_password(&body.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = state.tokens.issue(user.id)?;
    Ok(Json(AuthResponse {
        token,
        user: user.public(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailBody {
    pub token: String,
}

/// POST /users/verify-email — verification stub: any non-empty token
/// marks the session user verified.
pub async fn verify_email(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Json(body): Json<VerifyEmailBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.token.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "verification token is required".to_string(),
        ));
    }
    state.db.users.mark_verified(user.id).await?;
    Ok(Json(serde_json::json!({ "message": "email verified" })))
}

// =============================================================================
// PASSWORD RECOVERY
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub email: String,
}

/// POST /users/forgot-password
///
/// The response is identical whether or not the account exists, and a
/// mail delivery failure is logged rather than surfaced, so neither path
/// leaks which emails are registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(user) = state.db.users.find_by_email(&body.email).await? {
        let token = generate_reset_token();
        let expires = reset_token_expiry(Utc::now());
        state
            .db
            .users
            .set_reset_token(user.id, &token, expires)
            .await?;

        let link = state.config.reset_link(&token);
        let (subject, mail_body) = password_reset_email(&user.username, &link);
        if let Err(e) = state.mailer.send(&user.email, &subject, &mail_body).await {
            error!(
                subsystem = "api",
                op = "forgot_password",
                user_id = %user.id,
                error = %e,
                "Reset mail delivery failed"
            );
        }
    }

    Ok(Json(serde_json::json!({
        "message": "if the account exists, a reset link has been sent"
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub token: String,
    pub password: String,
}

/// POST /users/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validation::validate_password(&body.password).map_err(ApiError::from)?;

    let user = state
        .db
        .users
        .find_by_reset_token(body.token.trim())
        .await?
        .filter(|user| {
            user.reset_token_expires
                .map(|expires| expires > Utc::now())
                .unwrap_or(false)
        })
        .ok_or_else(|| ApiError::BadRequest("invalid or expired reset token".to_string()))?;

    let password_hash = sillage_auth::hash_password(&body.password)?;
    state
        .db
        .users
        .update_password(user.id, &password_hash)
        .await?;

    Ok(Json(serde_json::json!({ "message": "password updated" })))
}

// =============================================================================
// PROFILE
// =============================================================================

/// GET /users/profile
pub async fn get_profile(
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Json<UserPublic> {
    Json(user.public())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub preferences: Option<UserPreferences>,
}

/// PUT /users/profile — partial self-service update with uniqueness
/// re-checks on username and email.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Json<UserPublic>, ApiError> {
    let mut update = UpdateProfileRequest::default();

    if let Some(username) = &body.username {
        validation::validate_username(username).map_err(ApiError::from)?;
        if let Some(existing) = state.db.users.find_by_username(username).await? {
            if existing.id != user.id {
                return Err(ApiError::Conflict("username already taken".to_string()));
            }
        }
        update.username = Some(username.clone());
    }

    if let Some(email) = &body.email {
        validation::validate_email(email).map_err(ApiError::from)?;
        let email = email.trim().to_lowercase();
        if let Some(existing) = state.db.users.find_by_email(&email).await? {
            if existing.id != user.id {
                return Err(ApiError::Conflict("email already registered".to_string()));
            }
        }
        update.email = Some(email);
    }

    if let Some(password) = &body.password {
        validation::validate_password(password).map_err(ApiError::from)?;
        update.password_hash = Some(sillage_auth::hash_password(password)?);
    }

    if let Some(preferences) = &body.preferences {
        for family in &preferences.preferred_families {
            validation::validate_family(family).map_err(ApiError::from)?;
        }
        update.preferences = Some(preferences.clone());
    }

    state.db.users.update_profile(user.id, update).await?;
    let refreshed = state.db.users.fetch(user.id).await?;
    Ok(Json(refreshed.public()))
}

/// DELETE /users/profile — self-service account deletion. No cascade:
/// nothing else references the user row.
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<StatusCode, ApiError> {
    state.db.users.delete(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /users/profile/photo — avatar upload (multipart, 2 MB cap).
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut stored: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("photo") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let Some(extension) = extension_for_mime(&content_type) else {
            return Err(ApiError::BadRequest(format!(
                "unsupported photo type '{}' (jpeg/png/webp only)",
                content_type
            )));
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("photo upload failed: {}", e)))?;
        if data.len() > sillage_core::MAX_AVATAR_BYTES {
            return Err(ApiError::BadRequest("avatar exceeds 2 MB".to_string()));
        }
        stored = Some(
            state
                .assets
                .store(CATEGORY_AVATARS, extension, &data)
                .await?,
        );
    }

    let Some(photo_path) = stored else {
        return Err(ApiError::BadRequest(
            "multipart field 'photo' is required".to_string(),
        ));
    };

    state
        .db
        .users
        .update_profile(
            user.id,
            UpdateProfileRequest {
                photo_path: Some(photo_path.clone()),
                ..Default::default()
            },
        )
        .await?;
    if let Some(previous) = &user.photo_path {
        let _ = state.assets.delete(previous).await;
    }

    Ok(Json(serde_json::json!({ "photoPath": photo_path })))
}

// =============================================================================
// FAVORITES
// =============================================================================

/// POST /users/favorites/parfums/:id — idempotent add.
pub async fn add_favorite_parfum(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&raw_id, "parfum")?;
    if !state.db.parfums.exists(id).await? {
        return Err(ApiError::NotFound(format!("Parfum not found: {}", id)));
    }

    let (favorites, changed) = add_favorite(user.favorite_parfums, id);
    if changed {
        state
            .db
            .users
            .set_favorite_parfums(user.id, &favorites)
            .await?;
    }
    Ok(Json(serde_json::json!({ "favoriteParfums": favorites })))
}

/// DELETE /users/favorites/parfums/:id — removing a non-favorite is a
/// no-op, not an error.
pub async fn remove_favorite_parfum(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&raw_id, "parfum")?;
    let (favorites, changed) = remove_favorite(user.favorite_parfums, id);
    if changed {
        state
            .db
            .users
            .set_favorite_parfums(user.id, &favorites)
            .await?;
    }
    Ok(Json(serde_json::json!({ "favoriteParfums": favorites })))
}

/// POST /users/favorites/notes/:id — idempotent add.
pub async fn add_favorite_note(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&raw_id, "note")?;
    // 404 when the note does not exist.
    state.db.notes.fetch(id).await?;

    let (favorites, changed) = add_favorite(user.favorite_notes, id);
    if changed {
        state
            .db
            .users
            .set_favorite_notes(user.id, &favorites)
            .await?;
    }
    Ok(Json(serde_json::json!({ "favoriteNotes": favorites })))
}

/// DELETE /users/favorites/notes/:id
pub async fn remove_favorite_note(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&raw_id, "note")?;
    let (favorites, changed) = remove_favorite(user.favorite_notes, id);
    if changed {
        state
            .db
            .users
            .set_favorite_notes(user.id, &favorites)
            .await?;
    }
    Ok(Json(serde_json::json!({ "favoriteNotes": favorites })))
}

// =============================================================================
// HISTORY
// =============================================================================

/// POST /users/history/:parfumId — record a visit. The entry moves to the
/// front and the list is capped at the 50 most recent.
pub async fn add_history(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id, "parfum")?;
    if !state.db.parfums.exists(id).await? {
        return Err(ApiError::NotFound(format!("Parfum not found: {}", id)));
    }

    let history = push_visit(user.history, id, Utc::now());
    state.db.users.set_history(user.id, &history).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub parfum: Parfum,
    pub visited_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryItem>,
    pub pagination: PaginationMeta,
}

/// GET /users/history — paginated, with dangling perfume refs filtered out.
pub async fn list_history(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (page, limit) = sillage_core::clamp_pagination(query.page, query.limit);

    let ids: Vec<Uuid> = user.history.iter().map(|entry| entry.parfum_id).collect();
    let parfums = state.db.parfums.fetch_many(&ids).await?;
    let by_id: std::collections::HashMap<Uuid, Parfum> =
        parfums.into_iter().map(|p| (p.id, p)).collect();

    // Deleted perfumes drop out of the listing entirely.
    let alive: Vec<HistoryItem> = user
        .history
        .iter()
        .filter_map(|entry| {
            by_id.get(&entry.parfum_id).map(|parfum| HistoryItem {
                parfum: parfum.clone(),
                visited_at: entry.visited_at,
            })
        })
        .collect();

    let total = alive.len() as i64;
    let start = ((page - 1) * limit) as usize;
    let history: Vec<HistoryItem> = alive
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();

    Ok(Json(HistoryResponse {
        history,
        pagination: PaginationMeta::new(page, limit, total),
    }))
}

/// DELETE /users/history — clear the whole list.
pub async fn clear_history(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<StatusCode, ApiError> {
    state.db.users.set_history(user.id, &[]).await?;
    Ok(StatusCode::NO_CONTENT)
}
