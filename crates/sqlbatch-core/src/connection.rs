//! Execution service contract

use crate::{Parameter, Result, StatementResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Handle for cancelling a running statement from any thread.
///
/// A cancelled statement surfaces as `SqlBatchError::Cancelled` from
/// [`Connection::execute`], which the batching engine treats like any other
/// execution failure.
pub trait QueryCancelHandle: Send + Sync {
    /// Cancel the statement currently running on the associated connection.
    ///
    /// Safe to call from any thread; a no-op when nothing is running.
    fn cancel(&self);
}

/// A connection able to run prepared statements.
///
/// The command text may contain several `;`-separated statements sharing one
/// parameter list. Parameters are bound by name (`:p0` binds the parameter
/// named `p0`).
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgresql")
    fn driver_name(&self) -> &str;

    /// Execute a data-modifying command and report the affected row count
    async fn execute(&self, sql: &str, params: &[Parameter]) -> Result<StatementResult>;

    /// Get a handle that can be used to cancel running statements.
    ///
    /// Returns `None` if the driver does not support cancellation.
    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        None
    }
}
