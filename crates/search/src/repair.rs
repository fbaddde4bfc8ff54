//! Index repair execution
//!
//! Reconcilers only *describe* repairs as [`DeindexOp`]s. This module turns
//! one page's ops into a single index batch and executes it.
//!
//! The batch runs on its own task and is awaited. A consumer that drops the
//! read stream while a page is being repaired cancels the wait, not the
//! batch: the repair still completes.

use crate::error::ReadError;
use std::sync::Arc;
use verity_core::{DeindexOp, SecondaryIndex, VerityError};

/// Execute one page's repairs as a single batch
///
/// Returns the number of deindex operations applied. No batch is created
/// when `ops` is empty.
///
/// # Errors
///
/// [`ReadError::RepairLost`] if the batch fails to execute.
pub async fn execute_repairs(
    index: &Arc<dyn SecondaryIndex>,
    ops: &[DeindexOp],
) -> Result<usize, ReadError> {
    if ops.is_empty() {
        return Ok(0);
    }

    let mut batch = index.create_batch();
    for op in ops {
        batch.deindex(&op.edge, &op.id, op.version);
    }
    let count = batch.len();

    let handle = tokio::spawn(batch.execute());
    let outcome = match handle.await {
        Ok(result) => result,
        Err(join) => Err(VerityError::storage(format!(
            "index repair task failed: {}",
            join
        ))),
    };

    match outcome {
        Ok(()) => {
            tracing::debug!(target: "verity::repair", ops = count, "Executed index repairs");
            Ok(count)
        }
        Err(source) => {
            tracing::error!(
                target: "verity::repair",
                ops = count,
                error = %source,
                "Index repair batch failed"
            );
            Err(ReadError::RepairLost { ops: count, source })
        }
    }
}
