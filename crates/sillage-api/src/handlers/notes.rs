//! Olfactory note catalog handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sillage_core::{
    clamp_pagination, validation, CreateNoteRequest, ListNotesRequest, NotePosition, NoteStats,
    OlfactoryNote, OlfactoryNoteRepository, PaginationMeta, StatsRepository, UpdateNoteRequest,
};

use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
    /// Position filter; the legacy query parameter name is `type`.
    #[serde(rename = "type")]
    pub position: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListNotesResponse {
    pub notes: Vec<OlfactoryNote>,
    pub pagination: PaginationMeta,
}

/// GET /notes — list with position filter, name search, pagination.
pub async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<ListNotesResponse>, ApiError> {
    let (page, limit) = clamp_pagination(query.page, query.limit);
    let position = query
        .position
        .as_deref()
        .map(validation::parse_position_filter)
        .transpose()
        .map_err(ApiError::from)?;

    let result = state
        .db
        .notes
        .list(ListNotesRequest {
            position,
            search: query.search.clone().filter(|s| !s.trim().is_empty()),
            page,
            limit,
        })
        .await?;

    Ok(Json(ListNotesResponse {
        notes: result.notes,
        pagination: PaginationMeta::new(page, limit, result.total),
    }))
}

/// GET /notes/stats — counts grouped by position and family.
pub async fn note_stats(State(state): State<AppState>) -> Result<Json<NoteStats>, ApiError> {
    Ok(Json(state.db.stats.note_stats().await?))
}

/// GET /notes/:id
pub async fn get_note(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<OlfactoryNote>, ApiError> {
    let id = parse_id(&raw_id, "note")?;
    Ok(Json(state.db.notes.fetch(id).await?))
}

/// Create/update payload. Both position shapes are readable: the legacy
/// single `type` and the canonical `suggestedPositions` list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBody {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub legacy_type: Option<NotePosition>,
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

fn validate_note_body(body: &NoteBody) -> Result<(), ApiError> {
    if let Some(name) = &body.name {
        validation::validate_note_name(name).map_err(ApiError::from)?;
    }
    if let Some(description) = &body.description {
        validation::validate_note_description(description).map_err(ApiError::from)?;
    }
    if let Some(family) = &body.family {
        validation::validate_family(family).map_err(ApiError::from)?;
    }
    if let Some(intensity) = body.intensity {
        validation::validate_intensity(intensity).map_err(ApiError::from)?;
    }
    if let Some(color) = &body.color {
        validation::validate_color(color).map_err(ApiError::from)?;
    }
    Ok(())
}

async fn check_accord_references(state: &AppState, accords: &[Uuid]) -> Result<(), ApiError> {
    let missing = state.db.notes.missing_ids(accords).await?;
    if !missing.is_empty() {
        let listed: Vec<String> = missing.iter().map(Uuid::to_string).collect();
        return Err(ApiError::BadRequest(format!(
            "unknown accord note ids: {}",
            listed.join(", ")
        )));
    }
    Ok(())
}

/// POST /notes — create (admin).
pub async fn create_note(
    State(state): State<AppState>,
    Json(body): Json<NoteBody>,
) -> Result<impl IntoResponse, ApiError> {
    let name = body
        .name
        .clone()
        .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;
    let family = body
        .family
        .clone()
        .ok_or_else(|| ApiError::BadRequest("family is required".to_string()))?;
    validate_note_body(&body)?;

    if let Some(accords) = &body.accord_ids {
        check_accord_references(&state, accords).await?;
    }

    let id = state
        .db
        .notes
        .insert(CreateNoteRequest {
            name,
            description: body.description,
            legacy_position: body.legacy_type,
            suggested_positions: body.suggested_positions.unwrap_or_default(),
            family,
            intensity: body.intensity,
            color: body.color,
            image_url: body.image_url,
            synonyms: body.synonyms.unwrap_or_default(),
            accord_ids: body.accord_ids.unwrap_or_default(),
            seasons: body.seasons.unwrap_or_default(),
            times_of_day: body.times_of_day.unwrap_or_default(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// PUT /notes/:id — partial update (admin).
pub async fn update_note(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(body): Json<NoteBody>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id, "note")?;
    validate_note_body(&body)?;

    if let Some(accords) = &body.accord_ids {
        if accords.contains(&id) {
            return Err(ApiError::BadRequest(
                "a note cannot be its own accord".to_string(),
            ));
        }
        check_accord_references(&state, accords).await?;
    }

    state
        .db
        .notes
        .update(
            id,
            UpdateNoteRequest {
                name: body.name,
                description: body.description,
                legacy_position: body.legacy_type,
                suggested_positions: body.suggested_positions,
                family: body.family,
                intensity: body.intensity,
                color: body.color,
                image_url: body.image_url,
                synonyms: body.synonyms,
                accord_ids: body.accord_ids,
                seasons: body.seasons,
                times_of_day: body.times_of_day,
            },
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /notes/:id — blocked while any perfume references the note;
/// otherwise scrubs accord and favorite references before deleting.
pub async fn delete_note(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id, "note")?;
    state.db.notes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
