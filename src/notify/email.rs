// src/notify/email.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use metrics::counter;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::digest::{format_digest, DIGEST_TITLE};
use crate::config::{EmailSettings, MailCredentials};
use crate::ingest::Aggregator;

/// Delivers one plain-text message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, creds: &MailCredentials, subject: &str, body: &str) -> Result<()>;
}

/// SMTP submission with STARTTLS and login auth.
pub struct SmtpMailer {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(settings: &EmailSettings) -> Self {
        Self {
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
            timeout: settings.timeout(),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, creds: &MailCredentials, subject: &str, body: &str) -> Result<()> {
        let from: Mailbox = creds.user.parse().context("invalid sender address")?;
        let to: Mailbox = creds.receiver.parse().context("invalid receiver address")?;

        let msg = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build email")?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .context("invalid SMTP host")?
            .port(self.port)
            .credentials(Credentials::new(creds.user.clone(), creds.password.clone()))
            .timeout(Some(self.timeout))
            .build();

        mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { items: usize },
    SkippedMissingCredentials,
    Failed,
}

/// Builds the digest from the merged news and hands it to the transport.
/// Best effort: one attempt, no retry.
pub struct DigestDispatcher {
    aggregator: Arc<Aggregator>,
    transport: Arc<dyn MailTransport>,
    credentials: Option<MailCredentials>,
}

impl DigestDispatcher {
    pub fn new(
        aggregator: Arc<Aggregator>,
        transport: Arc<dyn MailTransport>,
        credentials: Option<MailCredentials>,
    ) -> Self {
        Self {
            aggregator,
            transport,
            credentials,
        }
    }

    pub async fn dispatch(&self) -> DispatchOutcome {
        tracing::info!(target: "digest", "starting digest dispatch");
        let Some(creds) = self.credentials.as_ref() else {
            tracing::warn!(target: "digest", "email credentials are not set, digest skipped");
            return DispatchOutcome::SkippedMissingCredentials;
        };

        let items = self.aggregator.get_merged_news().await;
        let body = format_digest(&items);

        match self.transport.send(creds, DIGEST_TITLE, &body).await {
            Ok(()) => {
                counter!("digest_sent_total").increment(1);
                tracing::info!(target: "digest", items = items.len(), "digest sent");
                DispatchOutcome::Sent { items: items.len() }
            }
            Err(e) => {
                counter!("digest_failures_total").increment(1);
                tracing::error!(target: "digest", error = ?e, "digest send failed");
                DispatchOutcome::Failed
            }
        }
    }
}

// --- Test helper ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message instead of sending it; optionally fails each send.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<SentMail>>,
    fail_with: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, creds: &MailCredentials, subject: &str, body: &str) -> Result<()> {
        if let Some(reason) = &self.fail_with {
            anyhow::bail!("{reason}");
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMail {
                from: creds.user.clone(),
                to: creds.receiver.clone(),
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
    async fn smtp_mailer_rejects_bad_sender_before_connecting() {
        let mailer = SmtpMailer::new(&EmailSettings::default());
        let creds = MailCredentials {
            user: "not an address".into(),
            password: "pw".into(),
            receiver: "you@example.com".into(),
        };
        let err = mailer.send(&creds, "s", "b").await.unwrap_err();
        assert!(err.to_string().contains("invalid sender"));
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let v = serde_json::to_value(DispatchOutcome::Sent { items: 3 }).unwrap();
        assert_eq!(v, serde_json::json!({"outcome": "sent", "items": 3}));
        let v = serde_json::to_value(DispatchOutcome::SkippedMissingCredentials).unwrap();
        assert_eq!(v, serde_json::json!({"outcome": "skipped_missing_credentials"}));
    }
}
