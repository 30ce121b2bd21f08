//! Row-count expectations and outcome verification

use crate::{Result, SqlBatchError};

/// The number of rows a statement is expected to affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    pub expected_row_count: u64,
    /// Whether the caller allows this statement to be merged with others
    pub can_be_batched: bool,
}

impl Expectation {
    /// Expect exactly `rows` affected rows; the statement may be batched.
    pub fn row_count(rows: u64) -> Self {
        Self {
            expected_row_count: rows,
            can_be_batched: true,
        }
    }

    /// Expect exactly `rows` affected rows, always executing the statement
    /// on its own.
    pub fn non_batchable(rows: u64) -> Self {
        Self {
            expected_row_count: rows,
            can_be_batched: false,
        }
    }

    /// Check the actual row count of a single statement
    pub fn verify(&self, actual: u64) -> Result<()> {
        if self.expected_row_count == actual {
            Ok(())
        } else {
            Err(SqlBatchError::OutcomeMismatch {
                expected: self.expected_row_count,
                actual,
                batched: false,
            })
        }
    }
}

/// Verifies the affected-row count reported by the execution service.
pub trait OutcomeVerifier: Send + Sync {
    /// Check the summed expectation of a flushed batch against its actual count
    fn verify_batched(&self, expected: u64, actual: u64) -> Result<()>;

    /// Check a statement executed on its own
    fn verify_non_batched(&self, expectation: &Expectation, actual: u64) -> Result<()>;
}

/// Strict equality check on row counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowCountVerifier;

impl OutcomeVerifier for RowCountVerifier {
    fn verify_batched(&self, expected: u64, actual: u64) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            tracing::warn!(expected, actual, "batch row count mismatch");
            Err(SqlBatchError::OutcomeMismatch {
                expected,
                actual,
                batched: true,
            })
        }
    }

    fn verify_non_batched(&self, expectation: &Expectation, actual: u64) -> Result<()> {
        expectation.verify(actual).inspect_err(|_| {
            tracing::warn!(
                expected = expectation.expected_row_count,
                actual,
                "statement row count mismatch"
            );
        })
    }
}
