//! Error classification — maps a failed backend call to an [`ErrorKind`].
//!
//! This is best-effort and heuristic. Structured signals (HTTP status,
//! transport fault) are consulted first; after that it falls back to substring
//! matching on the error message, which can drift as provider error formats
//! change. Unmatched failures are `Unknown`, which the retry policy treats as
//! non-retryable.

use std::fmt;

use crate::error::{BackendError, TransportFault};

/// Coarse failure category used to decide retry and fallback behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimit,
    Authentication,
    Network,
    InvalidRequest,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// Whether a failure of this kind is worth retrying on the same provider.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit | ErrorKind::Network | ErrorKind::Timeout
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Network => "network",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Checked in this order; the first category with a matching indicator wins.
const INDICATORS: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::RateLimit,
        &[
            "rate limit",
            "quota exceeded",
            "too many requests",
            "resource exhausted",
            "429",
        ],
    ),
    (
        ErrorKind::Authentication,
        &[
            "authentication",
            "unauthorized",
            "permission denied",
            "access denied",
            "401",
            "403",
        ],
    ),
    (
        ErrorKind::Network,
        &["connection", "network", "dns", "socket", "ssl", "tls"],
    ),
    (
        ErrorKind::InvalidRequest,
        &[
            "invalid request",
            "bad request",
            "malformed",
            "invalid parameter",
            "invalid model",
            "invalid input",
            "400",
        ],
    ),
    (
        ErrorKind::Timeout,
        &["timeout", "timed out", "deadline exceeded"],
    ),
];

/// Classify a failed backend call.
pub fn classify(err: &BackendError) -> ErrorKind {
    if let Some(kind) = err.status.and_then(classify_status) {
        return kind;
    }
    match err.transport {
        Some(TransportFault::Timeout) => ErrorKind::Timeout,
        Some(TransportFault::Connect) => ErrorKind::Network,
        None => classify_message(&err.message),
    }
}

/// Classify from an HTTP status code alone. `None` if the code is not decisive.
pub fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        429 => Some(ErrorKind::RateLimit),
        401 | 403 => Some(ErrorKind::Authentication),
        400 | 404 | 422 => Some(ErrorKind::InvalidRequest),
        408 | 504 => Some(ErrorKind::Timeout),
        _ => None,
    }
}

/// Classify from the error text alone.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    INDICATORS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
