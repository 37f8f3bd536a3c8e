//! Bearer-token session resolution and the admin gate.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;

use sillage_core::{User, UserRepository};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated user, attached to request extensions by
/// [`require_session`]. The password hash never leaves the handler layer:
/// responses are built from [`User::public`].
#[derive(Clone)]
pub struct SessionUser(pub User);

/// Extract and verify the bearer token, then load the referenced user.
///
/// Missing header, malformed header, invalid signature, and expired token
/// each produce their own 401 message; a valid token whose user has since
/// been deleted yields 404.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_bearer(&state, req.headers()).await?;
    req.extensions_mut().insert(SessionUser(user));
    Ok(next.run(req).await)
}

/// Require an already-resolved session with the admin flag set.
///
/// Layered inside [`require_session`] on admin routes.
pub async fn require_admin(
    Extension(SessionUser(user)): Extension<SessionUser>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !user.is_admin {
        return Err(ApiError::Forbidden("admin access required".to_string()));
    }
    Ok(next.run(req).await)
}

async fn resolve_bearer(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("malformed Authorization header".to_string()))?;

    let user_id = state.tokens.verify(token)?;

    match state.db.users.fetch(user_id).await {
        Ok(user) => Ok(user),
        Err(sillage_core::Error::UserNotFound(_)) => Err(ApiError::NotFound(
            "user for this token no longer exists".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}
