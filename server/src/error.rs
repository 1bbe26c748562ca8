//! Ingest-side error taxonomy (§4.9, §7). Kept axum-agnostic — the HTTP
//! mapping to status codes lives in `api::ApiError`, which wraps this.

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
