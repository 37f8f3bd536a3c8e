//! # sillage-auth
//!
//! Authentication primitives for sillage: Argon2id password hashing,
//! HS256 bearer tokens carrying the user id, and password-reset token
//! generation.

pub mod error;
pub mod password;
pub mod reset;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use password::{hash_password, verify_password};
pub use reset::{
    generate_reset_token, reset_token_expiry, RESET_TOKEN_BYTES, RESET_TOKEN_VALIDITY_MINUTES,
};
pub use token::{Claims, TokenService, TOKEN_VALIDITY_DAYS};
