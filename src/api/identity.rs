//! Identity backend collaborator.
//!
//! Accounts and credentials live in the managed backend; this service only
//! proves control of an email and then asks the backend to act.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, Instrument};
use url::Url;

#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Resolve the account registered under `email`, if any.
    async fn find_account(&self, email: &str) -> Result<Option<String>>;

    /// Replace the credential of the account registered under `email`.
    async fn update_credential(&self, email: &str, new_password: &SecretString) -> Result<()>;

    /// Mark a pending account as confirmed.
    async fn confirm_account(&self, account_id: &str) -> Result<()>;
}

/// Development backend: every email is its own account and writes are logged.
#[derive(Clone, Debug)]
pub struct LogIdentityBackend;

#[async_trait]
impl IdentityBackend for LogIdentityBackend {
    async fn find_account(&self, email: &str) -> Result<Option<String>> {
        Ok(Some(email.to_string()))
    }

    async fn update_credential(&self, email: &str, _new_password: &SecretString) -> Result<()> {
        info!(email, "identity stub: credential updated");
        Ok(())
    }

    async fn confirm_account(&self, account_id: &str) -> Result<()> {
        info!(account_id, "identity stub: account confirmed");
        Ok(())
    }
}

#[derive(Deserialize)]
struct AccountLookup {
    account_id: String,
}

/// REST client for the managed identity backend.
#[derive(Clone, Debug)]
pub struct HttpIdentityBackend {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl HttpIdentityBackend {
    /// # Errors
    /// Returns an error if the base URL cannot carry path segments or the HTTP
    /// client cannot be built.
    pub fn new(base_url: Url, api_key: Option<SecretString>, timeout: Duration) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Identity URL cannot be a base: {base_url}"));
        }
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build identity client")?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("Identity URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl IdentityBackend for HttpIdentityBackend {
    async fn find_account(&self, email: &str) -> Result<Option<String>> {
        let url = self.endpoint(&["v1", "accounts", "lookup"])?;
        let span = tracing::info_span!("identity.find_account", http.url = %url);
        let response = self
            .authorize(self.client.post(url))
            .json(&json!({ "email": email }))
            .send()
            .instrument(span)
            .await
            .context("Account lookup request failed")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let lookup: AccountLookup = response
            .error_for_status()
            .context("Account lookup rejected")?
            .json()
            .await
            .context("Invalid account lookup response")?;
        Ok(Some(lookup.account_id))
    }

    async fn update_credential(&self, email: &str, new_password: &SecretString) -> Result<()> {
        let url = self.endpoint(&["v1", "accounts", "credentials"])?;
        let span = tracing::info_span!("identity.update_credential", http.url = %url);
        self.authorize(self.client.post(url))
            .json(&json!({ "email": email, "password": new_password.expose_secret() }))
            .send()
            .instrument(span)
            .await
            .context("Credential update request failed")?
            .error_for_status()
            .context("Credential update rejected")?;
        Ok(())
    }

    async fn confirm_account(&self, account_id: &str) -> Result<()> {
        let url = self.endpoint(&["v1", "accounts", account_id, "confirm"])?;
        let span = tracing::info_span!("identity.confirm_account", http.url = %url);
        self.authorize(self.client.post(url))
            .send()
            .instrument(span)
            .await
            .context("Account confirmation request failed")?
            .error_for_status()
            .context("Account confirmation rejected")?;
        Ok(())
    }
}
