//! sqlbatch Batcher - merges INSERT and UPDATE statements into compound
//! statements
//!
//! Statements are classified by their text shape. Single-row INSERTs that
//! share a column list become one multi-row INSERT; single-predicate UPDATEs
//! are chained into one `;`-separated command. Placeholders are renamed so
//! that parameters never collide, and the summed row-count expectation of a
//! batch is verified when it executes.
//!
//! ```ignore
//! let mut batcher = StatementBatcher::new(connection, BatcherOptions::new())?;
//! batcher
//!     .submit(
//!         PendingStatement::new("INSERT INTO t (a) VALUES (:a)", vec![Parameter::new("a", 1)]),
//!         Expectation::row_count(1),
//!     )
//!     .await?;
//! batcher.flush().await?;
//! ```

pub mod batch;
pub mod classifier;
mod factory;
mod options;
pub mod renamer;
pub mod rewrite;
pub mod tokenizer;

#[cfg(test)]
mod test_helpers;

pub use batch::{
    AccumulatedBatch, BatchCommand, BatchKind, Disposition, FlushReport, StatementBatcher,
    SubmitOutcome,
};
pub use classifier::{
    Assignment, InsertShape, NotBatchableReason, StatementShape, SupportedUpdateShape, classify,
    is_batchable,
};
pub use factory::BatcherFactory;
pub use options::BatcherOptions;
pub use renamer::ParameterRenamer;
pub use rewrite::{fold, fold_insert, fold_update};
