//! Case-management API client
//!
//! Wraps `reqwest::Client` with base URL construction, an optional bearer
//! token, and a per-request timeout.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use lexsync_remote::client::RemoteClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = RemoteClient::new("https://cases.example.org/api", Duration::from_secs(30))?
//!     .with_token("api-token");
//! client.health().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use lexsync_core::config::RemoteConfig;
use lexsync_core::domain::{ChangeId, PendingChange};
use lexsync_core::ports::PushReceipt;

use crate::RemoteError;

/// Body of a `POST /changes` success response; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeAccepted {
    id: Option<ChangeId>,
    accepted_at: Option<DateTime<Utc>>,
}

/// HTTP client for the remote case-management API
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl RemoteClient {
    /// Creates a client for `base_url` whose requests time out after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lexsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        })
    }

    /// Creates a client from the `remote` config section
    pub fn from_config(config: &RemoteConfig, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Self::new(config.base_url.clone(), timeout)?;
        Ok(match &config.api_token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        })
    }

    /// Sends `token` as a bearer token with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a request builder for `path` relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, &url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends one pending change to `POST /changes`
    ///
    /// The body is the change's JSON form
    /// (`{id, type, recordId, payload, timestamp, retryCount}`). Missing or
    /// unreadable fields in a success response fall back to the change ID and
    /// the current time.
    pub async fn push_change(&self, change: &PendingChange) -> Result<PushReceipt, RemoteError> {
        debug!(change_id = %change.id(), kind = %change.kind(), "Pushing change");

        let response = self
            .request(Method::POST, "/changes")
            .json(change)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        let accepted = if body.trim().is_empty() {
            ChangeAccepted::default()
        } else {
            serde_json::from_str::<ChangeAccepted>(&body).unwrap_or_else(|e| {
                warn!(change_id = %change.id(), error = %e, "Unreadable push response body");
                ChangeAccepted::default()
            })
        };

        let receipt = PushReceipt {
            change_id: accepted.id.unwrap_or(*change.id()),
            accepted_at: accepted.accepted_at.unwrap_or_else(Utc::now),
        };

        if receipt.change_id != *change.id() {
            warn!(
                sent = %change.id(),
                echoed = %receipt.change_id,
                "Remote echoed a different change ID"
            );
        }

        debug!(change_id = %change.id(), "Change accepted");
        Ok(receipt)
    }

    /// Calls `GET /health`; any 2xx means the remote is reachable
    pub async fn health(&self) -> Result<(), RemoteError> {
        let response = self.request(Method::GET, "/health").send().await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Converts a non-success response into a typed error
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    Err(RemoteError::from_status(status, retry_after.as_deref(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = RemoteClient::new("https://cases.example.org/api/", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url(), "https://cases.example.org/api");
    }

    #[test]
    fn test_from_config_with_token() {
        let config = RemoteConfig {
            base_url: "https://cases.example.org/api".into(),
            api_token: Some("abc".into()),
        };
        let client = RemoteClient::from_config(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(client.api_token.as_deref(), Some("abc"));
    }
}
