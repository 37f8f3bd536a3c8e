//! # sillage-api
//!
//! HTTP API server for the sillage perfume catalog: routing, middleware
//! (session/admin/rate-limit/CORS/trace/request-id), handlers, and CSV
//! services. The binary in `main.rs` wires configuration, database, and
//! collaborators into [`build_router`].

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::{Config as SwaggerConfig, SwaggerUi};
use uuid::Uuid;

pub use state::AppState;

/// Request bodies are capped just above the largest accepted upload.
const MAX_REQUEST_BODY_BYTES: usize = 8 * 1024 * 1024;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful
/// for log correlation and production debugging.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// OPENAPI
// =============================================================================

/// OpenAPI documentation (utoipa metadata, used for Swagger UI configuration).
///
/// The comprehensive spec is maintained in `openapi.yaml` and served at
/// `/openapi.yaml`; Swagger UI at `/docs` fetches from that endpoint.
#[allow(dead_code)]
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sillage API",
        version = "1.4.0",
        description = "Perfume discovery catalog: search, similarity, favorites, and back-office"
    ),
    tags(
        (name = "Parfums", description = "Catalog search, similarity, and admin CRUD"),
        (name = "Notes", description = "Olfactory note catalog"),
        (name = "Users", description = "Accounts, favorites, and view history"),
        (name = "Admin", description = "Back-office stats and exports"),
        (name = "System", description = "Health check")
    )
)]
struct ApiDoc;

/// Serve the maintained OpenAPI YAML spec.
async fn openapi_yaml() -> impl IntoResponse {
    const SPEC: &str = include_str!("openapi.yaml");
    ([(header::CONTENT_TYPE, "application/yaml")], SPEC)
}

/// Liveness probe. Plain text on purpose: load balancers and uptime
/// checks don't want a JSON envelope.
async fn health_check() -> &'static str {
    "OK"
}

// =============================================================================
// ROUTER
// =============================================================================

/// Parse the configured CORS origins, dropping unparseable entries.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Build the full application router over the shared state.
pub fn build_router(state: AppState) -> Router {
    use handlers::{admin, notes, parfums, users};

    let session = axum::middleware::from_fn_with_state(state.clone(), middleware::require_session);
    let admin_gate = axum::middleware::from_fn(middleware::require_admin);
    // Session resolution must run before the admin check: ServiceBuilder
    // layers outermost-first.
    let admin_stack = ServiceBuilder::new()
        .layer(session.clone())
        .layer(admin_gate);

    let app = Router::new()
        // Health + API docs
        .route("/api/health", get(health_check))
        .merge(
            SwaggerUi::new("/docs").config(
                SwaggerConfig::new(["/openapi.yaml"])
                    .try_it_out_enabled(true)
                    .filter(true)
                    .display_request_duration(true),
            ),
        )
        .route("/openapi.yaml", get(openapi_yaml))
        // Perfume catalog: public reads, admin writes on the same paths
        .route(
            "/parfums",
            get(parfums::list_parfums)
                .merge(post(parfums::create_parfum).route_layer(admin_stack.clone())),
        )
        .route("/parfums/search", get(parfums::search_parfums))
        .route("/parfums/similarity", post(parfums::similarity_search))
        .route(
            "/parfums/export/csv",
            get(parfums::export_parfums_csv).route_layer(admin_stack.clone()),
        )
        .route(
            "/parfums/import/csv",
            post(parfums::import_parfums_csv).route_layer(admin_stack.clone()),
        )
        .route(
            "/parfums/:id",
            get(parfums::get_parfum).merge(
                put(parfums::update_parfum)
                    .delete(parfums::delete_parfum)
                    .route_layer(admin_stack.clone()),
            ),
        )
        .route("/parfums/:id/similar", get(parfums::similar_parfums))
        // Olfactory notes: public reads, admin writes
        .route(
            "/notes",
            get(notes::list_notes)
                .merge(post(notes::create_note).route_layer(admin_stack.clone())),
        )
        .route("/notes/stats", get(notes::note_stats))
        .route(
            "/notes/:id",
            get(notes::get_note).merge(
                put(notes::update_note)
                    .delete(notes::delete_note)
                    .route_layer(admin_stack.clone()),
            ),
        )
        // Accounts: registration and recovery are public
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/forgot-password", post(users::forgot_password))
        .route("/users/reset-password", post(users::reset_password))
        // Self-service routes require a session
        .route(
            "/users/verify-email",
            post(users::verify_email).route_layer(session.clone()),
        )
        .route(
            "/users/profile",
            get(users::get_profile)
                .put(users::update_profile)
                .delete(users::delete_profile)
                .route_layer(session.clone()),
        )
        .route(
            "/users/profile/photo",
            post(users::upload_avatar).route_layer(session.clone()),
        )
        .route(
            "/users/favorites/parfums/:id",
            post(users::add_favorite_parfum)
                .delete(users::remove_favorite_parfum)
                .route_layer(session.clone()),
        )
        .route(
            "/users/favorites/notes/:id",
            post(users::add_favorite_note)
                .delete(users::remove_favorite_note)
                .route_layer(session.clone()),
        )
        .route(
            "/users/history",
            get(users::list_history)
                .delete(users::clear_history)
                .route_layer(session.clone()),
        )
        .route(
            "/users/history/:id",
            post(users::add_history).route_layer(session.clone()),
        )
        // Back-office
        .route(
            "/admin/stats",
            get(admin::admin_stats).route_layer(admin_stack.clone()),
        )
        .route(
            "/admin/users",
            get(admin::list_users).route_layer(admin_stack.clone()),
        )
        .route(
            "/admin/users/:id/admin",
            patch(admin::toggle_admin).route_layer(admin_stack.clone()),
        )
        .route(
            "/admin/export/users.csv",
            get(admin::export_users_csv).route_layer(admin_stack.clone()),
        )
        .route(
            "/admin/export/parfums.csv",
            get(admin::export_parfums_csv).route_layer(admin_stack),
        );

    // The body limit and rate limiter rewrite the request/response body types
    // (`RequestBodyLimitLayer` yields a non-`Default` `ResponseBody`, and axum's
    // `from_fn` only services `Request<Body>`). Attach them as their own router
    // layers so axum re-normalizes the body back to `axum::body::Body` at each
    // router boundary. That keeps the outer tower-http stack composable — in
    // particular `CorsLayer`, whose `Service` impl requires a `Default` response
    // body — while preserving the original request ordering:
    // CORS -> body limit -> rate limit -> handlers (router layers apply
    // innermost-first, so rate_limit is added before the body limit).
    let app = app
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES));

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CatchPanicLayer::new())
            .layer(cors_layer(&state.config.allowed_origins)),
    )
    .with_state(state)
}
