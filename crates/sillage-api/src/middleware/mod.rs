//! Request middleware: session resolution, admin gate, rate limiting.

pub mod auth;
pub mod rate_limit;

pub use auth::{require_admin, require_session, SessionUser};
pub use rate_limit::rate_limit;
