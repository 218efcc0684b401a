//! Error types for the analytics engine, store, scraper client and service.

use thiserror::Error;

/// Precondition violations caught by the analytics engine.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// Snapshot timestamps must be non-decreasing.
    #[error("snapshots are not in ascending time order (first offending index: {index})")]
    UnsortedSnapshots { index: usize },

    /// Windows must not be negative.
    #[error("{name} window must not be negative (got {value})")]
    NegativeWindow { name: &'static str, value: i64 },

    /// The window reaches past the representable time range.
    #[error("{name} window of {value} is too large")]
    WindowTooLarge { name: &'static str, value: i64 },
}

/// Profile store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store document is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Account '{0}' is not tracked")]
    UnknownAccount(String),

    #[error("Account '{0}' is already tracked")]
    DuplicateAccount(String),
}

/// Scraper service client errors.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Cannot connect to scraper service at {0}")]
    Connect(String),

    #[error("Invalid scraper URL: {0}")]
    InvalidUrl(String),

    #[error("Scraper request timed out after {0}s")]
    Timeout(u64),

    #[error("Scraper service error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to talk to scraper service: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors surfaced by the analytics service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No usable data for the requested account.
    #[error("{what} for {username} not found")]
    NotFound { what: &'static str, username: String },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Cache entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn not_found(what: &'static str, username: &str) -> Self {
        ServiceError::NotFound {
            what,
            username: username.to_string(),
        }
    }
}
