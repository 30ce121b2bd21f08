//! Statement accumulation and flushing
//!
//! [`StatementBatcher`] owns at most one [`AccumulatedBatch`] and moves
//! between three states:
//!
//! - Idle: no live batch
//! - Accumulating: statements folded in, count below the threshold
//! - Flushing: the batch is taken, executed and verified
//!
//! Flushing always returns the batcher to Idle, whether execution and
//! verification succeed or not.

mod accumulator;
mod batcher;

pub use accumulator::{AccumulatedBatch, BatchCommand, BatchKind};
pub use batcher::{Disposition, FlushReport, StatementBatcher, SubmitOutcome};
