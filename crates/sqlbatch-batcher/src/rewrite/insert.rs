//! Folds single-row INSERTs into one multi-row INSERT

use sqlbatch_core::{Parameter, Result, SqlBatchError};

use super::PlaceholderMap;
use crate::batch::{AccumulatedBatch, BatchKind};
use crate::classifier::InsertShape;

/// Append the value tuple of `shape` to `batch`.
///
/// The first statement seeds the batch with its preamble
/// (`INSERT INTO t(a, b) VALUES (`); later ones add `, (` and their own
/// tuple. The closing `)` is written for every tuple.
pub fn fold_insert(
    batch: &mut AccumulatedBatch,
    shape: &InsertShape,
    parameters: &[Parameter],
) -> Result<()> {
    match batch.kind() {
        BatchKind::Insert { preamble } if *preamble == shape.preamble => {}
        BatchKind::Insert { preamble } => {
            return Err(SqlBatchError::Rewrite(format!(
                "INSERT `{}` cannot join a batch built for `{}`",
                shape.preamble, preamble
            )));
        }
        BatchKind::Update => {
            return Err(SqlBatchError::Rewrite(
                "INSERT cannot join an UPDATE batch".to_string(),
            ));
        }
    }

    let mut renamer = batch.renamer().clone();
    let mut map = PlaceholderMap::new(&mut renamer);

    let mut fragment = if batch.is_empty() {
        shape.preamble.clone()
    } else {
        ", (".to_string()
    };
    let values: Vec<String> = shape.values.iter().map(|v| map.rewrite(v)).collect();
    fragment.push_str(&values.join(", "));
    fragment.push(')');

    let renamed = map.remap_parameters(parameters)?;
    tracing::trace!(fragment = %fragment, parameters = renamed.len(), "folded INSERT");
    batch.append(&fragment, renamed, renamer);
    Ok(())
}
