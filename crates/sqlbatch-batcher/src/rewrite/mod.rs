//! Statement rewriters
//!
//! Each rewriter folds one classified statement into an [`AccumulatedBatch`]:
//! placeholders are renamed through the batch's [`ParameterRenamer`] and the
//! statement's parameters are copied over under their new names.
//!
//! Folding is all-or-nothing: the fragment and renamed parameters are built
//! against a copy of the renamer and only applied to the batch once every
//! check has passed, so a rejected statement leaves the batch untouched.

mod insert;
mod update;

pub use insert::fold_insert;
pub use update::fold_update;

use std::collections::HashSet;

use sqlbatch_core::{Parameter, Result, SqlBatchError};

use crate::batch::AccumulatedBatch;
use crate::classifier::StatementShape;
use crate::renamer::{ParameterRenamer, placeholder};
use crate::tokenizer::placeholders;

/// Fold a classified statement with the rewriter for its shape
pub fn fold(
    batch: &mut AccumulatedBatch,
    shape: &StatementShape,
    parameters: &[Parameter],
) -> Result<()> {
    match shape {
        StatementShape::Insert(insert) => fold_insert(batch, insert, parameters),
        StatementShape::Update(update) => fold_update(batch, update, parameters),
        StatementShape::NotBatchable(reason) => Err(SqlBatchError::Rewrite(format!(
            "statement cannot be batched: {reason}"
        ))),
    }
}

/// Original-to-fresh placeholder names for the statement being folded
pub(crate) struct PlaceholderMap<'r> {
    renamer: &'r mut ParameterRenamer,
    names: Vec<(String, String)>,
}

impl<'r> PlaceholderMap<'r> {
    pub(crate) fn new(renamer: &'r mut ParameterRenamer) -> Self {
        Self {
            renamer,
            names: Vec::new(),
        }
    }

    /// Rewrite every placeholder in `expression` to its fresh name. A
    /// placeholder that appears twice in one statement gets one fresh name.
    /// Expressions without placeholders are returned verbatim.
    pub(crate) fn rewrite(&mut self, expression: &str) -> String {
        let found = placeholders(expression);
        if found.is_empty() {
            return expression.to_string();
        }

        let mut rewritten = String::with_capacity(expression.len() + 4);
        let mut last_end = 0;
        for p in found {
            rewritten.push_str(&expression[last_end..p.start]);
            rewritten.push_str(&placeholder(self.fresh_name(p.name)));
            last_end = p.end;
        }
        rewritten.push_str(&expression[last_end..]);
        rewritten
    }

    fn fresh_name(&mut self, original: &str) -> &str {
        let idx = match self.names.iter().position(|(o, _)| o == original) {
            Some(idx) => idx,
            None => {
                let fresh = self.renamer.next_name();
                self.names.push((original.to_string(), fresh));
                self.names.len() - 1
            }
        };
        &self.names[idx].1
    }

    /// Copy the statement's parameters under their fresh names, keeping the
    /// statement's parameter order.
    ///
    /// Every placeholder must have exactly one parameter and every parameter
    /// must be referenced by the text.
    pub(crate) fn remap_parameters(self, parameters: &[Parameter]) -> Result<Vec<Parameter>> {
        let mut seen = HashSet::with_capacity(parameters.len());
        let mut renamed = Vec::with_capacity(parameters.len());

        for param in parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(SqlBatchError::Rewrite(format!(
                    "parameter `{}` is supplied more than once",
                    param.name
                )));
            }
            let fresh = self
                .names
                .iter()
                .find(|(original, _)| *original == param.name)
                .map(|(_, fresh)| fresh)
                .ok_or_else(|| {
                    SqlBatchError::Rewrite(format!(
                        "parameter `{}` is not referenced by the statement",
                        param.name
                    ))
                })?;
            renamed.push(param.renamed(fresh.as_str()));
        }

        if let Some((original, _)) = self
            .names
            .iter()
            .find(|(original, _)| !seen.contains(original.as_str()))
        {
            return Err(SqlBatchError::Rewrite(format!(
                "placeholder `{}` has no bound parameter",
                placeholder(original)
            )));
        }

        Ok(renamed)
    }
}
