//! Accumulation state for one in-progress batch

use sqlbatch_core::Parameter;

use crate::classifier::StatementShape;
use crate::renamer::ParameterRenamer;

/// What kind of compound statement a batch is building
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchKind {
    /// One multi-row INSERT; every folded row shares this preamble
    Insert { preamble: String },
    /// A sequence of standalone `;`-terminated UPDATEs
    Update,
}

impl BatchKind {
    /// The batch kind a batchable shape starts
    pub fn for_shape(shape: &StatementShape) -> Option<Self> {
        match shape {
            StatementShape::Insert(insert) => Some(BatchKind::Insert {
                preamble: insert.preamble.clone(),
            }),
            StatementShape::Update(_) => Some(BatchKind::Update),
            StatementShape::NotBatchable(_) => None,
        }
    }
}

/// The compound statement being built, its renamed parameters and the
/// running row-count expectation.
///
/// A batch only exists while at least one statement has been folded into
/// it; the engine drops it on flush.
#[derive(Debug, Clone)]
pub struct AccumulatedBatch {
    kind: BatchKind,
    sql: String,
    parameters: Vec<Parameter>,
    statement_count: usize,
    total_expected_rows: u64,
    renamer: ParameterRenamer,
}

/// A flushed batch, ready for the execution service
#[derive(Debug, Clone)]
pub struct BatchCommand {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    pub statement_count: usize,
    pub expected_rows: u64,
}

impl AccumulatedBatch {
    pub fn new(kind: BatchKind, parameter_stem: &str) -> Self {
        Self {
            kind,
            sql: String::new(),
            parameters: Vec::new(),
            statement_count: 0,
            total_expected_rows: 0,
            renamer: ParameterRenamer::new(parameter_stem),
        }
    }

    pub fn kind(&self) -> &BatchKind {
        &self.kind
    }

    /// Compound text so far, without the final terminator
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn statement_count(&self) -> usize {
        self.statement_count
    }

    pub fn total_expected_rows(&self) -> u64 {
        self.total_expected_rows
    }

    /// True until the first statement has been folded
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Whether `shape` can be folded into this batch without starting a new one
    pub fn accepts(&self, shape: &StatementShape) -> bool {
        match (&self.kind, shape) {
            (BatchKind::Insert { preamble }, StatementShape::Insert(insert)) => {
                *preamble == insert.preamble
            }
            (BatchKind::Update, StatementShape::Update(_)) => true,
            _ => false,
        }
    }

    pub(crate) fn renamer(&self) -> &ParameterRenamer {
        &self.renamer
    }

    /// Apply a fully validated fold
    pub(crate) fn append(
        &mut self,
        fragment: &str,
        parameters: Vec<Parameter>,
        renamer: ParameterRenamer,
    ) {
        self.sql.push_str(fragment);
        self.parameters.extend(parameters);
        self.renamer = renamer;
    }

    /// Count a folded statement and its expected row count
    pub(crate) fn record(&mut self, expected_rows: u64) {
        self.statement_count += 1;
        self.total_expected_rows += expected_rows;
    }

    /// Finish the compound statement with its terminator
    pub fn into_command(self) -> BatchCommand {
        let mut sql = self.sql;
        if !sql.trim_end().ends_with(';') {
            sql.push(';');
        }
        BatchCommand {
            sql,
            parameters: self.parameters,
            statement_count: self.statement_count,
            expected_rows: self.total_expected_rows,
        }
    }
}
