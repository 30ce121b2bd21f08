//! sqlbatch Core - shared types and service contracts
//!
//! This crate provides the types every other sqlbatch crate depends on:
//!
//! - `Connection` - the execution service (run a command, get a row count)
//! - `OutcomeVerifier` / `Expectation` - affected-row verification
//! - `Parameter` / `Value` - named parameters with type metadata
//! - `PendingStatement` - one caller-submitted INSERT/UPDATE
//! - `SqlBatchError` - the error type shared across the workspace

mod connection;
mod error;
mod expectation;
pub mod sql_text;
mod types;

pub use connection::*;
pub use error::*;
pub use expectation::*;
pub use sql_text::{split_statements, sql_preview};
pub use types::*;
