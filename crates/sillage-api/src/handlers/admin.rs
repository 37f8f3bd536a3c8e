//! Back-office handlers (admin gate applied at the router).

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use sillage_core::{
    clamp_pagination, AdminStats, ListUsersRequest, PaginationMeta, StatsRepository, UserPublic,
    UserRepository,
};

use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::services::export;
use crate::state::AppState;

/// GET /admin/stats — aggregated catalog and account counts.
pub async fn admin_stats(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    let users = state.db.stats.user_stats().await?;
    let parfums = state.db.stats.parfum_stats().await?;
    let notes = state.db.stats.note_stats().await?;
    Ok(Json(AdminStats {
        users,
        parfums,
        notes,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserPublic>,
    pub pagination: PaginationMeta,
}

/// GET /admin/users — substring search over username/email.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let (page, limit) = clamp_pagination(query.page, query.limit);
    let result = state
        .db
        .users
        .list(ListUsersRequest {
            search: query.search.clone().filter(|s| !s.trim().is_empty()),
            page,
            limit,
        })
        .await?;

    Ok(Json(ListUsersResponse {
        users: result.users.iter().map(|user| user.public()).collect(),
        pagination: PaginationMeta::new(page, limit, result.total),
    }))
}

/// PATCH /admin/users/:id/admin — flip the admin flag.
pub async fn toggle_admin(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&raw_id, "user")?;
    let user = state.db.users.fetch(id).await?;
    let next = !user.is_admin;
    state.db.users.set_admin(id, next).await?;
    Ok(Json(serde_json::json!({ "id": id, "isAdmin": next })))
}

/// GET /admin/export/users.csv
pub async fn export_users_csv(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let data = export::users_csv(&state.db).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"users.csv\"",
            ),
        ],
        data,
    ))
}

/// GET /admin/export/parfums.csv — same exporter as the catalog route.
pub async fn export_parfums_csv(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let data = export::parfums_csv(&state.db).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"parfums.csv\"",
            ),
        ],
        data,
    ))
}
