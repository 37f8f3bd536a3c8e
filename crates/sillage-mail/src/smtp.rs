//! SMTP backend built on lettre's async transport.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use sillage_core::SmtpConfig;

use crate::{MailError, MailResult, Mailer};

/// Production mailer: STARTTLS SMTP with username/password auth.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from the process configuration.
    pub fn new(config: &SmtpConfig) -> MailResult<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| MailError::Address(format!("SMTP_FROM '{}': {}", config.from, e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        info!(
            subsystem = "mail",
            component = "smtp",
            host = %config.host,
            port = config.port,
            "SMTP mailer configured"
        );

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> MailResult<()> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| MailError::Address(format!("recipient '{}': {}", to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        debug!(
            subsystem = "mail",
            component = "smtp",
            op = "send",
            subject = subject,
            "Message accepted by relay"
        );
        Ok(())
    }
}
