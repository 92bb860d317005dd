//! Crate-wide error type for the ingest core.
//!
//! Service/app-layer code uses `anyhow::Result` throughout; this type exists
//! for the ingest pipeline (`crate::ingest` and `crate::db`), where callers
//! want to match on the failure kind (fetch vs. parse vs. persistence vs.
//! gateway) rather than just propagate.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("upstream returned unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("push gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Fetch(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
