//! Error types for sieve operations.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Store not initialized at {0}")]
    NotInitialized(PathBuf),

    #[error("Store already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The index store failed or could not be reached. A filter evaluation
    /// that hits this must fail as a whole.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),
}

impl Error {
    /// Wrap any displayable failure from an index backend.
    pub fn index_unavailable(reason: impl std::fmt::Display) -> Self {
        Error::IndexUnavailable(reason.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
