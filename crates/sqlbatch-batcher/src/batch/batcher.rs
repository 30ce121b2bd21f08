//! The batching engine: accumulator, flush controller and fallback path

use std::fmt;
use std::sync::Arc;

use sqlbatch_core::{
    Connection, Expectation, OutcomeVerifier, PendingStatement, Result, RowCountVerifier,
    SqlBatchError, sql_preview,
};

use super::accumulator::{AccumulatedBatch, BatchKind};
use crate::classifier::{NotBatchableReason, StatementShape, classify};
use crate::options::BatcherOptions;
use crate::rewrite;

const PREVIEW_CHARS: usize = 100;

/// What happened to one executed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub statement_count: usize,
    pub parameter_count: usize,
    pub expected_rows: u64,
    pub affected_rows: u64,
}

/// Where a submitted statement ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Folded into a batch; `pending` statements are waiting afterwards
    /// (zero when the submission triggered a flush)
    Batched { pending: usize },
    /// Executed on its own and verified
    ExecutedImmediately { affected_rows: u64 },
}

/// Result of [`StatementBatcher::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub disposition: Disposition,
    /// Batches executed while handling the submission, oldest first
    pub flushes: Vec<FlushReport>,
}

impl SubmitOutcome {
    /// Whether the submission caused at least one batch to execute
    pub fn flushed(&self) -> bool {
        !self.flushes.is_empty()
    }
}

/// Merges INSERT and UPDATE statements into compound statements and
/// executes them against a [`Connection`].
///
/// One batcher belongs to one unit of work. Submissions take `&mut self`,
/// so a batcher cannot be fed from two places at once.
pub struct StatementBatcher {
    connection: Arc<dyn Connection>,
    verifier: Arc<dyn OutcomeVerifier>,
    options: BatcherOptions,
    batch: Option<AccumulatedBatch>,
}

impl StatementBatcher {
    /// Create a batcher that verifies row counts with [`RowCountVerifier`]
    pub fn new(connection: Arc<dyn Connection>, options: BatcherOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::from_parts(
            connection,
            Arc::new(RowCountVerifier),
            options,
        ))
    }

    /// Assemble a batcher from options that were already validated
    pub(crate) fn from_parts(
        connection: Arc<dyn Connection>,
        verifier: Arc<dyn OutcomeVerifier>,
        options: BatcherOptions,
    ) -> Self {
        Self {
            connection,
            verifier,
            options,
            batch: None,
        }
    }

    /// Replace the outcome verifier
    pub fn with_verifier(mut self, verifier: Arc<dyn OutcomeVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn options(&self) -> &BatcherOptions {
        &self.options
    }

    pub fn batch_size(&self) -> usize {
        self.options.batch_size
    }

    /// Change the flush threshold. A batch already above the new size
    /// flushes on the next submission.
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(SqlBatchError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        self.options.batch_size = batch_size;
        Ok(())
    }

    /// Statements folded since the last flush
    pub fn pending_statements(&self) -> usize {
        self.batch.as_ref().map_or(0, AccumulatedBatch::statement_count)
    }

    pub fn pending_parameters(&self) -> usize {
        self.batch.as_ref().map_or(0, |b| b.parameters().len())
    }

    /// Sum of the expectations folded since the last flush
    pub fn pending_expected_rows(&self) -> u64 {
        self.batch
            .as_ref()
            .map_or(0, AccumulatedBatch::total_expected_rows)
    }

    /// Compound text of the live batch, without its final terminator
    pub fn pending_sql(&self) -> Option<&str> {
        self.batch.as_ref().map(AccumulatedBatch::sql)
    }

    pub fn is_idle(&self) -> bool {
        self.batch.is_none()
    }

    /// Submit one statement with its row-count expectation.
    ///
    /// Batchable statements are folded into the live batch, which flushes
    /// once it holds `batch_size` statements or exceeds a configured limit.
    /// Anything else is executed immediately and verified on its own.
    pub async fn submit(
        &mut self,
        statement: PendingStatement,
        expectation: Expectation,
    ) -> Result<SubmitOutcome> {
        let shape = self.shape_of(&statement, &expectation);
        let mut flushes = Vec::new();

        let Some(kind) = BatchKind::for_shape(&shape) else {
            if self.options.flush_before_unbatchable {
                flushes.extend(self.flush().await?);
            }
            let affected_rows = self.execute_immediately(&statement, &expectation).await?;
            return Ok(SubmitOutcome {
                disposition: Disposition::ExecutedImmediately { affected_rows },
                flushes,
            });
        };

        if self.batch.as_ref().is_some_and(|b| !b.accepts(&shape)) {
            tracing::debug!("statement shape changed, flushing live batch");
            flushes.extend(self.flush().await?);
        }

        let stem = &self.options.parameter_stem;
        let batch = self
            .batch
            .get_or_insert_with(|| AccumulatedBatch::new(kind, stem));
        if let Err(e) = rewrite::fold(batch, &shape, &statement.parameters) {
            if batch.is_empty() {
                self.batch = None;
            }
            return Err(e);
        }
        batch.record(expectation.expected_row_count);
        tracing::debug!(
            kind = ?statement.kind,
            statements = batch.statement_count(),
            parameters = batch.parameters().len(),
            "statement folded into batch"
        );

        if self.limit_reached() {
            flushes.extend(self.flush().await?);
        }

        Ok(SubmitOutcome {
            disposition: Disposition::Batched {
                pending: self.pending_statements(),
            },
            flushes,
        })
    }

    /// Execute the live batch and verify its summed row count.
    ///
    /// Returns `Ok(None)` without touching the connection when idle. The
    /// batch is detached before execution, so the batcher is idle again
    /// whatever the outcome.
    pub async fn flush(&mut self) -> Result<Option<FlushReport>> {
        match self.batch.take() {
            Some(batch) => self.execute_batch(batch).await.map(Some),
            None => Ok(None),
        }
    }

    fn shape_of(&self, statement: &PendingStatement, expectation: &Expectation) -> StatementShape {
        if !expectation.can_be_batched {
            return StatementShape::NotBatchable(NotBatchableReason::ExpectationForbidsBatching);
        }
        match classify(&statement.sql) {
            StatementShape::Update(_) if !self.options.merge_updates => {
                StatementShape::NotBatchable(NotBatchableReason::UpdatesNotMerged)
            }
            shape => shape,
        }
    }

    fn limit_reached(&self) -> bool {
        let Some(batch) = &self.batch else {
            return false;
        };
        batch.statement_count() >= self.options.batch_size
            || self
                .options
                .max_statement_bytes
                .is_some_and(|max| batch.sql().len() >= max)
            || self
                .options
                .max_parameters
                .is_some_and(|max| batch.parameters().len() >= max)
    }

    #[tracing::instrument(
        skip(self, batch),
        fields(
            statements = batch.statement_count(),
            parameters = batch.parameters().len()
        )
    )]
    async fn execute_batch(&self, batch: AccumulatedBatch) -> Result<FlushReport> {
        let command = batch.into_command();
        tracing::info!(
            sql_preview = %sql_preview(&command.sql, PREVIEW_CHARS),
            parameters = command.parameters.len(),
            expected_rows = command.expected_rows,
            "executing batched command"
        );

        let result = self
            .connection
            .execute(&command.sql, &command.parameters)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "batched command failed"))?;
        self.verifier
            .verify_batched(command.expected_rows, result.affected_rows)?;

        Ok(FlushReport {
            statement_count: command.statement_count,
            parameter_count: command.parameters.len(),
            expected_rows: command.expected_rows,
            affected_rows: result.affected_rows,
        })
    }

    async fn execute_immediately(
        &self,
        statement: &PendingStatement,
        expectation: &Expectation,
    ) -> Result<u64> {
        tracing::debug!(
            sql_preview = %sql_preview(&statement.sql, PREVIEW_CHARS),
            parameters = statement.parameters.len(),
            "executing statement immediately"
        );

        let result = self
            .connection
            .execute(&statement.sql, &statement.parameters)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "statement failed"))?;
        self.verifier
            .verify_non_batched(expectation, result.affected_rows)?;
        Ok(result.affected_rows)
    }
}

impl fmt::Debug for StatementBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementBatcher")
            .field("driver", &self.connection.driver_name())
            .field("options", &self.options)
            .field("batch", &self.batch)
            .finish()
    }
}

impl Drop for StatementBatcher {
    fn drop(&mut self) {
        if let Some(batch) = &self.batch {
            tracing::warn!(
                statements = batch.statement_count(),
                "batcher dropped with unflushed statements"
            );
        }
    }
}
