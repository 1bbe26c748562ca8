//! Error taxonomy shared by the scanner and the server.
//!
//! Per-file problems never surface here — the orchestrator records those as
//! data in the scan summary (see `archivum-scanner::summary`). `ArchivumError`
//! is reserved for source-wide, fatal conditions.

use std::path::PathBuf;

/// Top-level error type for Scanner-side operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchivumError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hash engine error: {0}")]
    Hash(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("project detector error: {0}")]
    Detector(String),

    #[error("shell-out '{command}' failed or timed out: {detail}")]
    ShellOut { command: String, detail: String },

    #[error("root path does not exist or is not a directory: {0}")]
    InvalidRoot(PathBuf),
}

pub type Result<T> = std::result::Result<T, ArchivumError>;
