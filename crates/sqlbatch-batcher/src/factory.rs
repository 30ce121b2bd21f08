//! Creates one batcher per connection from shared options

use std::sync::Arc;

use sqlbatch_core::{Connection, OutcomeVerifier, Result, RowCountVerifier};

use crate::batch::StatementBatcher;
use crate::options::BatcherOptions;

/// Hands out [`StatementBatcher`]s configured from one validated set of options.
#[derive(Clone)]
pub struct BatcherFactory {
    options: BatcherOptions,
    verifier: Arc<dyn OutcomeVerifier>,
}

impl BatcherFactory {
    pub fn new(options: BatcherOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            verifier: Arc::new(RowCountVerifier),
        })
    }

    /// Use `verifier` for every batcher created from now on
    pub fn with_verifier(mut self, verifier: Arc<dyn OutcomeVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn options(&self) -> &BatcherOptions {
        &self.options
    }

    /// Create an idle batcher bound to `connection`
    pub fn create_batcher(&self, connection: Arc<dyn Connection>) -> StatementBatcher {
        tracing::debug!(
            driver = connection.driver_name(),
            batch_size = self.options.batch_size,
            "creating statement batcher"
        );
        StatementBatcher::from_parts(connection, self.verifier.clone(), self.options.clone())
    }
}

impl std::fmt::Debug for BatcherFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatcherFactory")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
