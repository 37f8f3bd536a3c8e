//! Perfume catalog handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use sillage_core::{
    clamp_pagination, parse_note_id_filter, rank_by_shared_notes, reference_note_set, validation,
    CreateParfumRequest, Genre, ListParfumsRequest, OlfactoryNoteRepository, PaginationMeta,
    ParfumRepository, ParfumSort, ParfumWithNotes, SearchParfumsRequest, UpdateParfumRequest,
    DEFAULT_SIMILARITY_LIMIT, MAX_REFERENCE_IDS, MAX_SIMILARITY_LIMIT, MIN_SEARCH_QUERY_LEN,
    SIMILAR_TO_ONE_LIMIT,
};
use sillage_db::{extension_for_mime, CATEGORY_PARFUMS};

use crate::error::ApiError;
use crate::handlers::{parse_id, parse_uuid_list_strict, populate_parfums};
use crate::services::{export, import};
use crate::state::AppState;

/// Result cap for the specialized search endpoint.
const SEARCH_RESULT_LIMIT: i64 = 20;

// =============================================================================
// LIST / SEARCH
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub genre: Option<String>,
    /// Comma-separated note ids; malformed entries are silently dropped.
    pub notes: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListParfumsResponse {
    pub parfums: Vec<ParfumWithNotes>,
    pub pagination: PaginationMeta,
}

fn parse_genre(raw: Option<&str>) -> Result<Option<Genre>, ApiError> {
    match raw {
        None => Ok(None),
        Some(value) => Genre::parse(value)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown genre '{}'", value))),
    }
}

/// GET /parfums — list with filters, sorting, and pagination.
pub async fn list_parfums(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListParfumsResponse>, ApiError> {
    let (page, limit) = clamp_pagination(query.page, query.limit);
    let genre = parse_genre(query.genre.as_deref())?;
    let note_ids = query
        .notes
        .as_deref()
        .map(parse_note_id_filter)
        .unwrap_or_default();
    let sort_by = query
        .sort_by
        .as_deref()
        .and_then(ParfumSort::parse)
        .unwrap_or_default();

    let result = state
        .db
        .parfums
        .list(ListParfumsRequest {
            search: query.search.clone().filter(|s| !s.trim().is_empty()),
            genre,
            note_ids,
            page,
            limit,
            sort_by,
        })
        .await?;

    debug!(
        subsystem = "api",
        op = "list_parfums",
        result_count = result.parfums.len(),
        total = result.total,
        "Listed parfums"
    );

    let parfums = populate_parfums(&state.db, result.parfums, false).await?;
    Ok(Json(ListParfumsResponse {
        parfums,
        pagination: PaginationMeta::new(page, limit, result.total),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub marque: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchParfumsResponse {
    pub parfums: Vec<ParfumWithNotes>,
}

/// GET /parfums/search — specialized text search, popularity-ranked.
pub async fn search_parfums(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchParfumsResponse>, ApiError> {
    let q = query.q.as_deref().unwrap_or("").trim().to_string();
    if q.chars().count() < MIN_SEARCH_QUERY_LEN {
        return Err(ApiError::BadRequest(format!(
            "search query must be at least {} characters",
            MIN_SEARCH_QUERY_LEN
        )));
    }

    let results = state
        .db
        .parfums
        .search(SearchParfumsRequest {
            query: q,
            genre: parse_genre(query.genre.as_deref())?,
            brand: query.marque.clone().filter(|b| !b.trim().is_empty()),
            limit: SEARCH_RESULT_LIMIT,
        })
        .await?;

    let parfums = populate_parfums(&state.db, results, false).await?;
    Ok(Json(SearchParfumsResponse { parfums }))
}

// =============================================================================
// DETAIL
// =============================================================================

/// GET /parfums/:id — detail view with populated notes.
///
/// The popularity increment is dispatched as a detached best-effort task:
/// the response never waits on it and its failure is only logged.
pub async fn get_parfum(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ParfumWithNotes>, ApiError> {
    let id = parse_id(&raw_id, "parfum")?;
    let parfum = state.db.parfums.fetch(id).await?;
    let mut populated = populate_parfums(&state.db, vec![parfum], true).await?;

    let repo = state.db.parfums.clone();
    tokio::spawn(async move {
        if let Err(e) = repo.bump_popularity(id).await {
            warn!(
                subsystem = "api",
                op = "bump_popularity",
                parfum_id = %id,
                error = %e,
                "Popularity increment failed"
            );
        }
    });

    Ok(Json(populated.remove(0)))
}

// =============================================================================
// SIMILARITY
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityHit {
    #[serde(flatten)]
    pub parfum: ParfumWithNotes,
    pub common_notes_count: usize,
    pub similarity_percentage: u32,
}

#[derive(Debug, Serialize)]
pub struct SimilarParfumsResponse {
    pub similar: Vec<SimilarityHit>,
}

async fn rank_against_references(
    state: &AppState,
    reference_ids: &[Uuid],
    limit: usize,
) -> Result<Vec<SimilarityHit>, ApiError> {
    let references = state.db.parfums.fetch_many(reference_ids).await?;
    let reference_notes = reference_note_set(&references);
    if reference_notes.is_empty() {
        return Ok(Vec::new());
    }

    let note_ids: Vec<Uuid> = reference_notes.iter().copied().collect();
    let candidates = state
        .db
        .parfums
        .sharing_any_note(&note_ids, reference_ids)
        .await?;
    let ranked = rank_by_shared_notes(&reference_notes, candidates, limit);

    let (parfums, scores): (Vec<_>, Vec<_>) = ranked
        .into_iter()
        .map(|hit| (hit.parfum, (hit.common_notes_count, hit.similarity_percentage)))
        .unzip();
    let populated = populate_parfums(&state.db, parfums, false).await?;

    Ok(populated
        .into_iter()
        .zip(scores)
        .map(|(parfum, (common, percentage))| SimilarityHit {
            parfum,
            common_notes_count: common,
            similarity_percentage: percentage,
        })
        .collect())
}

/// GET /parfums/:id/similar — six closest perfumes by shared notes.
pub async fn similar_parfums(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<SimilarParfumsResponse>, ApiError> {
    let id = parse_id(&raw_id, "parfum")?;
    // 404 when the reference itself is missing.
    state.db.parfums.fetch(id).await?;

    let similar = rank_against_references(&state, &[id], SIMILAR_TO_ONE_LIMIT).await?;
    Ok(Json(SimilarParfumsResponse { similar }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityRequest {
    pub parfum_ids: Vec<Uuid>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SimilarityResponse {
    pub results: Vec<SimilarityHit>,
}

/// POST /parfums/similarity — similarity against a submitted reference set.
pub async fn similarity_search(
    State(state): State<AppState>,
    Json(req): Json<SimilarityRequest>,
) -> Result<Json<SimilarityResponse>, ApiError> {
    if req.parfum_ids.is_empty() || req.parfum_ids.len() > MAX_REFERENCE_IDS {
        return Err(ApiError::BadRequest(format!(
            "parfumIds must contain between 1 and {} ids",
            MAX_REFERENCE_IDS
        )));
    }
    let limit = req
        .limit
        .unwrap_or(DEFAULT_SIMILARITY_LIMIT)
        .clamp(1, MAX_SIMILARITY_LIMIT);

    let results = rank_against_references(&state, &req.parfum_ids, limit).await?;
    Ok(Json(SimilarityResponse { results }))
}

// =============================================================================
// CREATE / UPDATE / DELETE (admin)
// =============================================================================

/// Parsed multipart form shared by create and update.
#[derive(Default)]
struct ParfumForm {
    fields: UpdateParfumRequest,
    photo: Option<(Vec<u8>, &'static str)>,
}

async fn read_parfum_form(mut multipart: Multipart) -> Result<ParfumForm, ApiError> {
    let mut form = ParfumForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
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
                if data.len() > sillage_core::MAX_PHOTO_BYTES {
                    return Err(ApiError::BadRequest("photo exceeds 5 MB".to_string()));
                }
                form.photo = Some((data.to_vec(), extension));
            }
            _ => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("malformed field: {}", e)))?;
                apply_text_field(&mut form.fields, &name, text)?;
            }
        }
    }
    Ok(form)
}

fn apply_text_field(
    fields: &mut UpdateParfumRequest,
    name: &str,
    text: String,
) -> Result<(), ApiError> {
    match name {
        "name" => fields.name = Some(text),
        "brand" | "marque" => fields.brand = Some(text),
        "genre" => {
            fields.genre = Some(
                Genre::parse(&text)
                    .ok_or_else(|| ApiError::BadRequest(format!("unknown genre '{}'", text)))?,
            )
        }
        "description" => fields.description = Some(text),
        "notes" => fields.note_ids = Some(parse_uuid_list_strict(&text)?),
        "topNotes" => fields.top_note_ids = Some(parse_uuid_list_strict(&text)?),
        "heartNotes" => fields.heart_note_ids = Some(parse_uuid_list_strict(&text)?),
        "baseNotes" => fields.base_note_ids = Some(parse_uuid_list_strict(&text)?),
        "merchantLinks" => {
            fields.merchant_links = Some(serde_json::from_str(&text).map_err(|e| {
                ApiError::BadRequest(format!("merchantLinks must be a JSON array: {}", e))
            })?)
        }
        "barcode" => fields.barcode = Some(text),
        "price" => {
            let price: f64 = text
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid price '{}'", text)))?;
            fields.price = Some(price);
        }
        // Unknown fields are ignored so frontend form additions do not
        // break older servers.
        _ => {}
    }
    Ok(())
}

fn validate_parfum_fields(fields: &UpdateParfumRequest) -> Result<(), ApiError> {
    if let Some(name) = &fields.name {
        validation::validate_parfum_name(name).map_err(ApiError::from)?;
    }
    if let Some(brand) = &fields.brand {
        validation::validate_brand(brand).map_err(ApiError::from)?;
    }
    if let Some(description) = &fields.description {
        validation::validate_parfum_description(description).map_err(ApiError::from)?;
    }
    if let Some(price) = fields.price {
        validation::validate_price(price).map_err(ApiError::from)?;
    }
    if let Some(links) = &fields.merchant_links {
        validation::validate_merchant_links(links).map_err(ApiError::from)?;
    }
    Ok(())
}

async fn check_note_references(
    state: &AppState,
    fields: &UpdateParfumRequest,
) -> Result<(), ApiError> {
    let referenced = fields.referenced_note_ids();
    let missing = state.db.notes.missing_ids(&referenced).await?;
    if !missing.is_empty() {
        let listed: Vec<String> = missing.iter().map(Uuid::to_string).collect();
        return Err(ApiError::BadRequest(format!(
            "unknown note ids: {}",
            listed.join(", ")
        )));
    }
    Ok(())
}

/// POST /parfums — create (admin, multipart with optional photo).
pub async fn create_parfum(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_parfum_form(multipart).await?;
    let fields = form.fields;

    let name = fields
        .name
        .clone()
        .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;
    let brand = fields
        .brand
        .clone()
        .ok_or_else(|| ApiError::BadRequest("brand is required".to_string()))?;
    let genre = fields
        .genre
        .ok_or_else(|| ApiError::BadRequest("genre is required".to_string()))?;

    validate_parfum_fields(&fields)?;
    check_note_references(&state, &fields).await?;

    let photo_url = match &form.photo {
        Some((data, extension)) => Some(
            state
                .assets
                .store(CATEGORY_PARFUMS, extension, data)
                .await?,
        ),
        None => None,
    };

    let insert = state
        .db
        .parfums
        .insert(CreateParfumRequest {
            name,
            brand,
            genre,
            description: fields.description,
            note_ids: fields.note_ids.unwrap_or_default(),
            top_note_ids: fields.top_note_ids.unwrap_or_default(),
            heart_note_ids: fields.heart_note_ids.unwrap_or_default(),
            base_note_ids: fields.base_note_ids.unwrap_or_default(),
            photo_url: photo_url.clone(),
            merchant_links: fields.merchant_links.unwrap_or_default(),
            barcode: fields.barcode,
            price: fields.price,
        })
        .await;

    match insert {
        Ok(id) => Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id })))),
        Err(e) => {
            // Don't leave an orphaned upload behind a failed insert.
            if let Some(path) = &photo_url {
                let _ = state.assets.delete(path).await;
            }
            Err(e.into())
        }
    }
}

/// PUT /parfums/:id — partial update (admin, multipart with optional photo).
pub async fn update_parfum(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id, "parfum")?;
    let form = read_parfum_form(multipart).await?;
    let mut fields = form.fields;

    validate_parfum_fields(&fields)?;
    check_note_references(&state, &fields).await?;

    if let Some((data, extension)) = &form.photo {
        let previous = state.db.parfums.fetch(id).await?.photo_url;
        let stored = state
            .assets
            .store(CATEGORY_PARFUMS, extension, data)
            .await?;
        fields.photo_url = Some(stored);
        if let Some(previous) = previous {
            let _ = state.assets.delete(&previous).await;
        }
    }

    state.db.parfums.update(id, fields).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /parfums/:id — hard delete (admin). Favorites and history
/// entries pointing at the deleted perfume are left behind; readers
/// filter them out.
pub async fn delete_parfum(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id, "parfum")?;
    state.db.parfums.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// CSV EXPORT / IMPORT (admin)
// =============================================================================

/// GET /parfums/export/csv — full catalog export.
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

/// POST /parfums/import/csv — batch import, row failures don't abort.
pub async fn import_parfums_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("file upload failed: {}", e)))?;
            file = Some(data.to_vec());
        }
    }
    let Some(data) = file else {
        return Err(ApiError::BadRequest(
            "multipart field 'file' is required".to_string(),
        ));
    };

    let summary = import::import_parfums_csv(&state.db, &data).await?;
    Ok(Json(summary))
}
