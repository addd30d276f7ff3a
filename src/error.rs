//! Failure types returned by the API client.
//!
//! Both kinds wrap the same [`RequestFailure`]; they stay distinct so the
//! controller can tell a failed read apart from a failed pipeline trigger.

use thiserror::Error;

/// Why a single backend request did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
    /// The backend answered with a non-success status.
    #[error("server returned HTTP {status}")]
    Status { status: u16, detail: Option<String> },
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection, TLS or protocol failure before a response was read.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body was not the expected JSON shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl RequestFailure {
    /// Server-provided human-readable detail, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            RequestFailure::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// The most specific description available: server detail first, then our own text.
    pub fn describe(&self) -> String {
        match self.detail().map(str::trim) {
            Some(detail) if !detail.is_empty() => detail.to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for RequestFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RequestFailure::Timeout
        } else if e.is_decode() {
            RequestFailure::Decode(e.to_string())
        } else {
            RequestFailure::Transport(e.to_string())
        }
    }
}

/// Failure of a read-only request (preview, stats).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(transparent)]
pub struct FetchError(#[from] pub RequestFailure);

impl FetchError {
    pub fn describe(&self) -> String {
        self.0.describe()
    }
}

/// Failure of the pipeline trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(transparent)]
pub struct PipelineError(#[from] pub RequestFailure);

impl PipelineError {
    pub fn describe(&self) -> String {
        self.0.describe()
    }
}
