//! Error types for sillage-auth.

use thiserror::Error;

/// Result type alias for auth operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Errors raised by hashing and token operations.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Password hashing/parsing failed
    #[error("Hash error: {0}")]
    Hash(String),

    /// Token could not be signed
    #[error("Token signing error: {0}")]
    Signing(String),

    /// Token is malformed or its signature does not verify
    #[error("Invalid token")]
    TokenInvalid,

    /// Token signature verifies but the token is past its expiry
    #[error("Token expired")]
    TokenExpired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(AuthError::TokenInvalid.to_string(), "Invalid token");
        assert_eq!(AuthError::TokenExpired.to_string(), "Token expired");
        assert_eq!(
            AuthError::Hash("bad salt".to_string()).to_string(),
            "Hash error: bad salt"
        );
    }
}
