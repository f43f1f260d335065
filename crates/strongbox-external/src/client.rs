// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the external secret vault.
//!
//! Handles authentication, token caching, and status mapping. Requests are
//! never retried here: a failed write may or may not have been applied.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use strongbox_config::model::ExternalConfig;
use strongbox_core::{BackendError, StrongboxError};

use crate::token::CachedToken;

const DEFAULT_POLICY: &str = "root";

/// Resolved connection settings.
#[derive(Clone)]
pub struct VaultSettings {
    pub base_url: String,
    pub account: String,
    pub user: String,
    pub api_key: String,
    pub policy: String,
    pub token_ttl: Duration,
    pub timeout: Duration,
}

impl std::fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSettings")
            .field("base_url", &self.base_url)
            .field("account", &self.account)
            .field("user", &self.user)
            .field("api_key", &"[REDACTED]")
            .field("policy", &self.policy)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl VaultSettings {
    pub fn from_config(config: &ExternalConfig) -> Result<Self, StrongboxError> {
        let require = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| StrongboxError::Config(format!("external.{key} is required")))
        };
        Ok(Self {
            base_url: require(&config.base_url, "base_url")?
                .trim_end_matches('/')
                .to_string(),
            account: require(&config.account, "account")?,
            user: require(&config.user, "user")?,
            api_key: require(&config.api_key, "api_key")?,
            policy: config
                .policy
                .clone()
                .unwrap_or_else(|| DEFAULT_POLICY.to_string()),
            token_ttl: Duration::from_secs(config.token_ttl_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[derive(Debug)]
pub struct VaultClient {
    http: reqwest::Client,
    settings: VaultSettings,
    token: Mutex<Option<CachedToken>>,
}

impl VaultClient {
    pub fn new(settings: VaultSettings) -> Result<Self, StrongboxError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            settings,
            token: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    /// A valid token, authenticating first when none is cached or it expired.
    async fn token(&self) -> Result<CachedToken, StrongboxError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.clone());
        }

        let url = format!(
            "{}/authn/{}/{}/authenticate",
            self.settings.base_url, self.settings.account, self.settings.user
        );
        debug!(account = %self.settings.account, user = %self.settings.user, "authenticating with vault");
        let response = self
            .http
            .post(&url)
            .body(self.settings.api_key.clone())
            .send()
            .await
            .map_err(|e| unavailable(format!("authentication request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "authenticate"));
        }
        let raw = response
            .text()
            .await
            .map_err(|e| unavailable(format!("failed to read token: {e}")))?;

        let token = CachedToken::new(raw, self.settings.token_ttl);
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<reqwest::Response, StrongboxError> {
        let token = self.token().await?;
        let response = request
            .header(AUTHORIZATION, token.authorization())
            .send()
            .await
            .map_err(|e| unavailable(format!("{operation} request failed: {e}")))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!(operation, status = %status, "vault rejected token");
            self.forget_token().await;
        }
        Ok(response)
    }

    /// Declare `variable` under the configured policy. Repeating is harmless.
    pub async fn ensure_variable(&self, variable: &str) -> Result<(), StrongboxError> {
        let url = format!(
            "{}/policies/{}/policy/{}",
            self.settings.base_url, self.settings.account, self.settings.policy
        );
        let response = self
            .send(
                self.http.put(&url).body(format!("- !variable {variable}")),
                "policy",
            )
            .await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            s => Err(status_error(s, "policy")),
        }
    }

    pub async fn set_variable(&self, variable: &str, value: &str) -> Result<(), StrongboxError> {
        let response = self
            .send(
                self.http.post(self.variable_url(variable)).body(value.to_string()),
                "set",
            )
            .await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            s => Err(status_error(s, "set")),
        }
    }

    /// The stored value, or `None` when the variable does not exist.
    pub async fn get_variable(&self, variable: &str) -> Result<Option<String>, StrongboxError> {
        let response = self
            .send(self.http.get(self.variable_url(variable)), "get")
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, "get"));
        }

        let body = response
            .text()
            .await
            .map_err(|e| unavailable(format!("failed to read variable: {e}")))?;
        // Values come back JSON-encoded; fall back to the raw body.
        Ok(Some(
            serde_json::from_str::<String>(&body).unwrap_or(body),
        ))
    }

    fn variable_url(&self, variable: &str) -> String {
        format!(
            "{}/secrets/{}/variable/{}/{}",
            self.settings.base_url, self.settings.account, self.settings.policy, variable
        )
    }
}

fn unavailable(message: String) -> StrongboxError {
    BackendError::BackendUnavailable(message).into()
}

fn status_error(status: StatusCode, operation: &str) -> StrongboxError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::AuthenticationFailure(format!("{operation} returned {status}")).into()
        }
        _ => unavailable(format!("{operation} returned {status}")),
    }
}
