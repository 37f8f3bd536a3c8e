//! Signed bearer tokens (JWT HS256).
//!
//! Tokens carry the user id as their only claim (`sub`) and are valid for
//! [`TOKEN_VALIDITY_DAYS`]. Expired and malformed tokens are reported as
//! distinct errors so the HTTP layer can answer with distinct messages.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Bearer token validity window.
pub const TOKEN_VALIDITY_DAYS: i64 = 30;

/// JWT claims: the user id is the only payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user UUID.
    pub sub: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Issues and verifies bearer tokens with a shared HS256 secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
        }
    }

    /// Issue a token for a user, valid for [`TOKEN_VALIDITY_DAYS`].
    pub fn issue(&self, user_id: Uuid) -> AuthResult<String> {
        self.issue_with_validity(user_id, Duration::days(TOKEN_VALIDITY_DAYS))
    }

    /// Issue a token with an explicit validity window (used by tests).
    pub fn issue_with_validity(&self, user_id: Uuid, validity: Duration) -> AuthResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded user id.
    pub fn verify(&self, token: &str) -> AuthResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            }
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::TokenInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-secret-at-least-16-bytes")
    }

    #[test]
    fn test_issue_then_verify_resolves_same_user() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let token = svc.issue(user_id).unwrap();
        assert_eq!(svc.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_expired_token_is_distinct_error() {
        let svc = service();
        // jsonwebtoken applies default leeway to exp; go well past it.
        let token = svc
            .issue_with_validity(Uuid::new_v4(), Duration::seconds(-3600))
            .unwrap();
        match svc.verify(&token) {
            Err(AuthError::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let svc = service();
        match svc.verify("not.a.jwt") {
            Err(AuthError::TokenInvalid) => {}
            other => panic!("expected TokenInvalid, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_wrong_secret_fails_verification() {
        let token = service().issue(Uuid::new_v4()).unwrap();
        let other = TokenService::new(b"another-secret-entirely!");
        assert!(matches!(other.verify(&token), Err(AuthError::TokenInvalid)));
    }
}
