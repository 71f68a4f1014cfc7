//! Error types for the provider layer.
//!
//! - [`BackendError`] — one failed backend call, as the transport reported it.
//! - [`ProviderError`] — a provider client giving up on a call (after retries).

use thiserror::Error;

use crate::classify::ErrorKind;

/// Transport-level fault reported by the HTTP stack, when known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportFault {
    Timeout,
    Connect,
}

/// A single failed backend call.
///
/// `status` and `transport` are the structured signals the classifier prefers;
/// `message` is what it falls back to.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    pub status: Option<u16>,
    pub transport: Option<TransportFault>,
}

impl BackendError {
    /// An error known only by its message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            transport: None,
        }
    }

    /// A non-success HTTP response.
    pub fn http(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self {
            message,
            status: Some(status),
            transport: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            transport: Some(TransportFault::Timeout),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            transport: Some(TransportFault::Connect),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::timeout(err.to_string())
        } else if err.is_connect() {
            BackendError::connect(err.to_string())
        } else {
            BackendError {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()),
                transport: None,
            }
        }
    }
}

/// A provider client could not produce a result.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend kept failing (or failed in a non-retryable way).
    #[error("{provider} request failed after {attempts} attempt(s) [{kind}]: {source}")]
    Request {
        provider: String,
        kind: ErrorKind,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// The call was cancelled before it finished.
    #[error("{provider} call cancelled")]
    Cancelled { provider: String },

    /// The client could not be built (e.g. missing credentials).
    #[error("{provider} is not configured: {reason}")]
    NotConfigured { provider: String, reason: String },
}

impl ProviderError {
    /// Classification of the failure, for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Request { kind, .. } => *kind,
            ProviderError::Cancelled { .. } => ErrorKind::Unknown,
            ProviderError::NotConfigured { .. } => ErrorKind::Authentication,
        }
    }

    /// Name of the provider that failed.
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Request { provider, .. }
            | ProviderError::Cancelled { provider }
            | ProviderError::NotConfigured { provider, .. } => provider,
        }
    }
}
