//! Code delivery abstractions.
//!
//! Handlers hand a [`MailMessage`] to a [`MailSender`] right after issuing a
//! code. The sender decides how to deliver it (provider webhook, SMTP relay,
//! logging in development) and returns `Ok`/`Err`. On `Err` the handler
//! deletes the freshly issued record so no undeliverable code stays live.
//!
//! The default sender for local dev is `LogMailSender`, which logs and
//! returns `Ok(())`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, Instrument};
use url::Url;

use crate::otp::OtpRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTemplate {
    PasswordReset,
    EmailVerification,
}

impl MailTemplate {
    #[must_use]
    pub const fn subject(self) -> &'static str {
        match self {
            Self::PasswordReset => "Your password reset code",
            Self::EmailVerification => "Verify your email",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MailMessage {
    pub to_email: String,
    pub template: MailTemplate,
    pub subject: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl MailMessage {
    #[must_use]
    pub fn for_record(template: MailTemplate, record: &OtpRecord) -> Self {
        Self {
            to_email: record.email.clone(),
            template,
            subject: template.subject().to_string(),
            code: record.code.clone(),
            expires_at: record.expires_at,
        }
    }
}

#[async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver a message or return an error so the caller can roll back.
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = ?message.template,
            code = %message.code,
            expires_at = %message.expires_at,
            "mail send stub"
        );
        Ok(())
    }
}

/// Posts each message as JSON to a mail provider webhook.
#[derive(Clone, Debug)]
pub struct WebhookMailSender {
    client: reqwest::Client,
    url: Url,
    api_key: Option<SecretString>,
}

impl WebhookMailSender {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: Url, api_key: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build mail webhook client")?;
        Ok(Self {
            client,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl MailSender for WebhookMailSender {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let mut request = self.client.post(self.url.clone()).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let span = tracing::info_span!(
            "mail.send",
            mail.template = ?message.template,
            http.url = %self.url
        );
        request
            .send()
            .instrument(span)
            .await
            .context("Mail webhook request failed")?
            .error_for_status()
            .context("Mail webhook rejected message")?;
        Ok(())
    }
}

/// Build the message for `record` and hand it to `sender`.
///
/// # Errors
/// Propagates the sender error.
pub async fn deliver(sender: &dyn MailSender, template: MailTemplate, record: &OtpRecord) -> Result<()> {
    sender.send(&MailMessage::for_record(template, record)).await
}
