// Fetch error taxonomy and the error side channel exposed to the presentation layer

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors from a status source or an operation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, reset, TLS).
    #[error("request failed: {0}")]
    Network(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP status other than 401.
    #[error("remote returned HTTP {status}")]
    Http { status: u16 },

    /// 401 from the remote. The transport has already cleared the session.
    #[error("session is not authorized")]
    Unauthorized,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("no status source available: {0}")]
    Unavailable(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Unauthorized => ErrorKind::Unauthorized,
            FetchError::Malformed(_) => ErrorKind::Malformed,
            _ => ErrorKind::Transient,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Retried implicitly by the next tick.
    Transient,
    /// Fatal to the session, not to the aggregator.
    Unauthorized,
    Malformed,
    /// Some sources failed while others succeeded.
    Partial,
}

/// Last refresh failure as shown next to stale data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshError {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
    pub consecutive_failures: u32,
}

impl RefreshError {
    pub fn from_fetch(err: &FetchError, at: DateTime<Utc>, consecutive_failures: u32) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            at,
            consecutive_failures,
        }
    }

    pub fn partial(failed_sources: &[String], at: DateTime<Utc>) -> Self {
        Self {
            kind: ErrorKind::Partial,
            message: format!("sources failed: {}", failed_sources.join(", ")),
            at,
            consecutive_failures: 0,
        }
    }
}
