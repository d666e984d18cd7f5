//! Error types for the screening engine.
//!
//! Domain-level failures are isolated per adapter and reported as data in
//! the run summary; only workspace I/O failures and a fully failed run
//! surface as hard errors to the caller.

use thiserror::Error;

/// Errors raised inside a domain adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream service returned {status}: {reason}")]
    Upstream { status: u16, reason: String },

    #[error("invalid upstream response: {reason}")]
    InvalidResponse { reason: String },
}

impl AdapterError {
    /// Machine-readable error kind, recorded per domain in the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Http(e) if e.is_decode() => "invalid_response",
            AdapterError::Http(_) | AdapterError::Upstream { .. } => "transient_upstream",
            AdapterError::InvalidResponse { .. } => "invalid_response",
        }
    }

    /// Whether an internal retry policy may reasonably absorb this error.
    pub fn is_transient(&self) -> bool {
        match self {
            AdapterError::Http(e) => e.is_timeout() || e.is_connect(),
            AdapterError::Upstream { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Errors that fail the whole screening request.
#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("workspace I/O failure at {path}: {source}")]
    WorkspaceIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no domain analysis succeeded ({failed} domains failed)")]
    NoDomainsSucceeded { failed: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScreeningError>;
