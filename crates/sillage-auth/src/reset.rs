//! Password-reset tokens.
//!
//! A reset token is 256 random bits rendered as 64 hex characters, stored
//! on the user record with a one-hour expiry.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

/// Raw entropy per reset token.
pub const RESET_TOKEN_BYTES: usize = 32;

/// Reset tokens expire after one hour.
pub const RESET_TOKEN_VALIDITY_MINUTES: i64 = 60;

/// Generate a fresh random reset token (64 hex chars).
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Expiry timestamp for a token issued at `now`.
pub fn reset_token_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(RESET_TOKEN_VALIDITY_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_64_hex_chars() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    #[test]
    fn test_expiry_is_one_hour_out() {
        let now = Utc::now();
        let expiry = reset_token_expiry(now);
        assert_eq!((expiry - now).num_minutes(), 60);
    }
}
