//! Global in-process rate limiting.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::state::AppState;

/// Reject requests beyond the configured global budget with 429.
/// A no-op when rate limiting is disabled.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            warn!(
                subsystem = "api",
                component = "rate_limit",
                path = %req.uri().path(),
                "Request rejected by rate limiter"
            );
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "message": "rate limit exceeded" })),
            )
                .into_response();
        }
    }
    next.run(req).await
}
