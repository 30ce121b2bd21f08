//! Mock execution service for batcher tests

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlbatch_core::{Connection, Parameter, Result, SqlBatchError, StatementResult};

/// One command received by [`RecordingConnection`]
#[derive(Debug, Clone)]
pub struct ExecutedCommand {
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

impl ExecutedCommand {
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Records every command and answers with scripted results.
///
/// Without a scripted response a command reports one affected row per
/// top-level statement in its text (per value tuple for multi-row INSERTs).
#[derive(Default)]
pub struct RecordingConnection {
    executed: Mutex<Vec<ExecutedCommand>>,
    responses: Mutex<VecDeque<Result<u64>>>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the affected-row count for the next command
    pub fn respond_rows(&self, rows: u64) -> &Self {
        self.responses.lock().push_back(Ok(rows));
        self
    }

    /// Queue a failure for the next command
    pub fn respond_error(&self, error: SqlBatchError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.executed.lock().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().iter().map(|c| c.sql.clone()).collect()
    }
}

fn default_rows(sql: &str) -> u64 {
    let statements = sqlbatch_core::split_statements(sql);
    statements
        .iter()
        .map(|s| {
            if s.trim_start().to_ascii_uppercase().starts_with("INSERT") {
                s.matches("), (").count() as u64 + 1
            } else {
                1
            }
        })
        .sum()
}

#[async_trait]
impl Connection for RecordingConnection {
    fn driver_name(&self) -> &str {
        "recording"
    }

    async fn execute(&self, sql: &str, params: &[Parameter]) -> Result<StatementResult> {
        self.executed.lock().push(ExecutedCommand {
            sql: sql.to_string(),
            parameters: params.to_vec(),
        });
        let response = self.responses.lock().pop_front();
        match response {
            Some(Ok(rows)) => Ok(StatementResult::new(rows)),
            Some(Err(e)) => Err(e),
            None => Ok(StatementResult::new(default_rows(sql))),
        }
    }
}

/// Route engine logs to the test output; RUST_LOG controls the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
