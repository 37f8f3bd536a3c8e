//! Runtime configuration.
//!
//! The configuration is read from the environment exactly once, in `main`,
//! and handed to components as an explicit value. Business logic never
//! consults ambient environment state.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Maximum accepted avatar upload size (2 MB).
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

/// Maximum accepted perfume photo upload size (5 MB).
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// SMTP settings for the outbound mail collaborator.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// From address used on every outbound message.
    pub from: String,
}

/// Process-wide configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Secret used to sign bearer tokens.
    pub token_secret: String,
    /// CORS origin whitelist.
    pub allowed_origins: Vec<String>,
    /// Directory the filesystem asset backend writes under.
    pub asset_dir: PathBuf,
    /// Public base URL prefixed onto stored asset paths.
    pub public_base_url: String,
    /// Frontend base URL used in password-reset links.
    pub frontend_url: String,
    /// SMTP collaborator settings; `None` disables outbound mail.
    pub smtp: Option<SmtpConfig>,
    /// Global requests-per-minute budget; `None` disables rate limiting.
    pub rate_limit_per_minute: Option<u32>,
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// Required: `DATABASE_URL`, `TOKEN_SECRET`.
    /// Optional: `BIND_ADDR`, `ALLOWED_ORIGINS` (comma-separated),
    /// `ASSET_DIR`, `PUBLIC_BASE_URL`, `FRONTEND_URL`, `SMTP_HOST`,
    /// `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`,
    /// `RATE_LIMIT_PER_MINUTE`.
    pub fn from_env() -> Result<Self> {
        let database_url = require("DATABASE_URL")?;
        let token_secret = require("TOKEN_SECRET")?;
        if token_secret.len() < 16 {
            return Err(Error::Config(
                "TOKEN_SECRET must be at least 16 bytes".to_string(),
            ));
        }

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let asset_dir = PathBuf::from(
            std::env::var("ASSET_DIR").unwrap_or_else(|_| "./assets".to_string()),
        );

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: std::env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(587),
                username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
                password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
                from: std::env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "no-reply@sillage.app".to_string()),
            }),
            _ => None,
        };

        let rate_limit_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0);

        Ok(Self {
            database_url,
            bind_addr,
            token_secret,
            allowed_origins,
            asset_dir,
            public_base_url,
            frontend_url,
            smtp,
            rate_limit_per_minute,
        })
    }

    /// Password-reset link sent in the recovery email.
    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_url, token)
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("missing required environment variable {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_link_shape() {
        let config = Config {
            database_url: "postgres://localhost/sillage".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            token_secret: "0123456789abcdef".to_string(),
            allowed_origins: vec![],
            asset_dir: PathBuf::from("./assets"),
            public_base_url: "http://localhost:3000".to_string(),
            frontend_url: "https://sillage.app".to_string(),
            smtp: None,
            rate_limit_per_minute: None,
        };
        assert_eq!(
            config.reset_link("abc123"),
            "https://sillage.app/reset-password?token=abc123"
        );
    }
}
