use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::config::SmtpConfig;

#[async_trait]
pub trait MailClient: Send + Sync {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// SMTP delivery over lettre's async transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = if config.use_tls {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .context("build SMTP relay")?
                .credentials(creds)
                .port(config.port)
                .build()
        } else if !config.username.is_empty() {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .credentials(creds)
                .port(config.port)
                .build()
        } else {
            // No auth, plain connection (Mailpit/Mailhog in local development).
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        };

        let from: Mailbox = config.from.parse().context("invalid MAIL_FROM address")?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailClient for SmtpMailer {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build message")?;

        self.transport.send(message).await.context("smtp send")?;
        debug!(to = %to, subject = %subject, "mail sent");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Captures outgoing mail instead of delivering it. Used by `AppState::fake()`
/// and handler tests to assert on what would have been sent.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails, for exercising delivery-error paths.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mailer lock").clone()
    }

    pub fn was_sent_to(&self, email: &str) -> bool {
        self.sent
            .lock()
            .expect("mailer lock")
            .iter()
            .any(|m| m.to == email)
    }
}

#[async_trait]
impl MailClient for MockMailer {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("mock mailer configured to fail");
        }
        self.sent.lock().expect("mailer lock").push(SentMail {
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
    async fn mock_mailer_captures_sent_mail() {
        let mailer = MockMailer::new();
        mailer
            .send_mail("alice@example.com", "Hi", "body text")
            .await
            .expect("mock send should succeed");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
        assert_eq!(sent[0].subject, "Hi");
        assert!(mailer.was_sent_to("alice@example.com"));
        assert!(!mailer.was_sent_to("bob@example.com"));
    }

    #[tokio::test]
    async fn failing_mock_mailer_errors() {
        let mailer = MockMailer::failing();
        let err = mailer
            .send_mail("alice@example.com", "Hi", "body")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("fail"));
        assert!(mailer.sent().is_empty());
    }
}
