//! Error types for sqlbatch

use thiserror::Error;

/// Core error type for batching operations
#[derive(Error, Debug)]
pub enum SqlBatchError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// The execution service rejected the statement (constraint violation,
    /// syntax error, ...)
    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A statement did not have the shape the rewriters require
    #[error("Rewrite error: {0}")]
    Rewrite(String),

    #[error(
        "Unexpected row count: expected {expected}, actual {actual} ({})",
        outcome_scope(.batched)
    )]
    OutcomeMismatch {
        expected: u64,
        actual: u64,
        batched: bool,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid options file: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl SqlBatchError {
    /// Whether the error came from the execution service rather than from
    /// the engine itself.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            SqlBatchError::Connection(_)
                | SqlBatchError::Query(_)
                | SqlBatchError::Timeout(_)
                | SqlBatchError::Cancelled
        )
    }
}

fn outcome_scope(batched: &bool) -> &'static str {
    if *batched { "batched" } else { "single statement" }
}

/// Result type alias for sqlbatch operations
pub type Result<T> = std::result::Result<T, SqlBatchError>;
