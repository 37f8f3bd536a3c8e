//! In-memory mailer for tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::{MailResult, Mailer};

/// A message recorded by [`MemoryMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Test mailer that records every message instead of delivering it.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<RecordedMessage>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<RecordedMessage> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> MailResult<()> {
        self.sent
            .lock()
            .expect("mailer lock poisoned")
            .push(RecordedMessage {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        mailer
            .send("user@example.com", "Hello", "Body text")
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "user@example.com");
        assert_eq!(sent[0].subject, "Hello");
    }
}
