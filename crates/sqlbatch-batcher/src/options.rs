//! Batcher configuration

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlbatch_core::{Result, SqlBatchError};

static STEM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Configuration options for statement batching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherOptions {
    /// Number of merged statements that triggers an automatic flush
    pub batch_size: usize,
    /// Name stem of renamed parameters (`p` gives `:p0`, `:p1`, ...)
    pub parameter_stem: String,
    /// Flush threshold on the compound text length in bytes. Checked after
    /// each fold, so the flushed command can exceed it by one statement.
    pub max_statement_bytes: Option<usize>,
    /// Flush threshold on the bound parameter count. Checked after each
    /// fold like `max_statement_bytes`.
    pub max_parameters: Option<usize>,
    /// Merge UPDATEs as well as INSERTs
    pub merge_updates: bool,
    /// Flush the pending batch before running a statement that cannot be
    /// merged, so statements reach the database in submission order
    pub flush_before_unbatchable: bool,
}

impl BatcherOptions {
    /// Create new batcher options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the automatic flush threshold
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_parameter_stem(mut self, stem: impl Into<String>) -> Self {
        self.parameter_stem = stem.into();
        self
    }

    pub fn with_max_statement_bytes(mut self, max: usize) -> Self {
        self.max_statement_bytes = Some(max);
        self
    }

    pub fn with_max_parameters(mut self, max: usize) -> Self {
        self.max_parameters = Some(max);
        self
    }

    pub fn with_merge_updates(mut self, merge: bool) -> Self {
        self.merge_updates = merge;
        self
    }

    pub fn with_flush_before_unbatchable(mut self, flush: bool) -> Self {
        self.flush_before_unbatchable = flush;
        self
    }

    /// Check that the options describe a usable batcher
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SqlBatchError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !STEM_REGEX.is_match(&self.parameter_stem) {
            return Err(SqlBatchError::Configuration(format!(
                "parameter_stem `{}` is not a valid identifier",
                self.parameter_stem
            )));
        }
        if self.max_statement_bytes == Some(0) || self.max_parameters == Some(0) {
            return Err(SqlBatchError::Configuration(
                "statement limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate options from TOML text. Missing keys keep their
    /// defaults.
    ///
    /// ```
    /// use sqlbatch_batcher::BatcherOptions;
    ///
    /// let options = BatcherOptions::from_toml_str("batch_size = 50").unwrap();
    /// assert_eq!(options.batch_size, 50);
    /// assert!(options.merge_updates);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let options: Self = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading batcher options");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl Default for BatcherOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            parameter_stem: "p".to_string(),
            max_statement_bytes: None,
            max_parameters: None,
            merge_updates: true,
            flush_before_unbatchable: true,
        }
    }
}
