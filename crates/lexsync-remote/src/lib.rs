//! LexSync Remote - case-management API client
//!
//! Provides an async client for:
//! - Pushing pending changes (`POST /changes`)
//! - Health probing (`GET /health`)
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with base URL, bearer token, and timeout
//! - [`endpoint`] - `IRemoteEndpoint` adapter over the client

pub mod client;
pub mod endpoint;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

pub use client::RemoteClient;
pub use endpoint::HttpRemoteEndpoint;

/// Errors that can occur when talking to the remote API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The bearer token is missing, invalid, or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token is valid but lacks permission for this case
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The target record does not exist on the remote
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote rejected the change because the record moved on
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Any other non-success status
    #[error("Unexpected status: HTTP {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(reqwest::Error),

    /// The client could not be constructed
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::NetworkError(e)
        }
    }
}

/// Default wait when a 429 carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

impl RemoteError {
    /// Maps a non-success HTTP status to a typed error
    pub fn from_status(status: StatusCode, retry_after: Option<&str>, body: String) -> Self {
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            body
        };

        match status {
            StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
            StatusCode::FORBIDDEN => RemoteError::Forbidden(message),
            StatusCode::NOT_FOUND => RemoteError::NotFound(message),
            StatusCode::CONFLICT => RemoteError::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => RemoteError::TooManyRequests {
                retry_after: retry_after
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_RETRY_AFTER),
            },
            s if s.is_server_error() => RemoteError::ServerError {
                status: s.as_u16(),
                message,
            },
            s => RemoteError::UnexpectedStatus {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Returns true for failures a later attempt may fix
    ///
    /// `Unauthorized` counts as transient: it concerns the token, not the
    /// change, and clears once the token is renewed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Unauthorized(_)
                | RemoteError::TooManyRequests { .. }
                | RemoteError::ServerError { .. }
                | RemoteError::Timeout
                | RemoteError::NetworkError(_)
        )
    }
}
