//! # sillage-mail
//!
//! Outbound email collaborator. The service only ever sends transactional
//! mail (password-reset links), so the contract is a single `send` of a
//! plain-text message. Backends: SMTP via lettre for deployments, an
//! in-memory recorder for tests.

pub mod memory;
pub mod messages;
pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryMailer;
pub use messages::password_reset_email;
pub use smtp::SmtpMailer;

/// Result type alias for mail operations.
pub type MailResult<T> = std::result::Result<T, MailError>;

/// Errors raised by the mail collaborator.
#[derive(Error, Debug)]
pub enum MailError {
    /// Recipient or sender address failed to parse
    #[error("Invalid address: {0}")]
    Address(String),

    /// Message could not be built
    #[error("Message build error: {0}")]
    Build(String),

    /// The transport rejected or failed to deliver the message
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Asynchronous outbound mail sender.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a plain-text message. Delivery failures surface as `MailError`;
    /// callers decide whether they are fatal for the enclosing request.
    async fn send(&self, to: &str, subject: &str, body: &str) -> MailResult<()>;
}
