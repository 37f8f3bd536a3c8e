//! Shared application state.

use std::sync::Arc;

use sillage_auth::TokenService;
use sillage_core::Config;
use sillage_db::{AssetBackend, Database};
use sillage_mail::Mailer;

/// Global rate limiter type (direct quota, no keyed bucketing).
pub type GlobalRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    /// Bearer token issuing/verification.
    pub tokens: Arc<TokenService>,
    /// Outbound email collaborator.
    pub mailer: Arc<dyn Mailer>,
    /// Uploaded-image storage collaborator.
    pub assets: Arc<dyn AssetBackend>,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}
