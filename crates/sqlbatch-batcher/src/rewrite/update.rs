//! Folds single-predicate UPDATEs into a compound statement

use sqlbatch_core::{Parameter, Result, SqlBatchError};

use super::PlaceholderMap;
use crate::batch::{AccumulatedBatch, BatchKind};
use crate::classifier::SupportedUpdateShape;

/// Append `shape` to `batch` as a standalone, `;`-terminated UPDATE.
///
/// SQL cannot carry a different predicate per row in one UPDATE, so each
/// statement stays whole: `UPDATE t SET x = :p0 WHERE id = :p1;`.
pub fn fold_update(
    batch: &mut AccumulatedBatch,
    shape: &SupportedUpdateShape,
    parameters: &[Parameter],
) -> Result<()> {
    if *batch.kind() != BatchKind::Update {
        return Err(SqlBatchError::Rewrite(
            "UPDATE cannot join an INSERT batch".to_string(),
        ));
    }

    let mut renamer = batch.renamer().clone();
    let mut map = PlaceholderMap::new(&mut renamer);

    let assignments: Vec<String> = shape
        .assignments
        .iter()
        .map(|a| format!("{} = {}", a.column, map.rewrite(&a.value)))
        .collect();
    let predicate_value = map.rewrite(&shape.predicate_value);

    let separator = if batch.is_empty() { "" } else { " " };
    let fragment = format!(
        "{separator}UPDATE {} SET {} WHERE {} = {};",
        shape.table,
        assignments.join(", "),
        shape.predicate_column,
        predicate_value
    );

    let renamed = map.remap_parameters(parameters)?;
    tracing::trace!(fragment = %fragment, parameters = renamed.len(), "folded UPDATE");
    batch.append(&fragment, renamed, renamer);
    Ok(())
}
