//! Read-path errors
//!
//! Divergence between index and store is never an error on the read path;
//! it is logged, repaired where possible, and the candidate dropped. Only a
//! collaborator failure that would lose results or repairs is fatal.

use thiserror::Error;
use verity_core::{SearchEdge, VerityError};

/// Fatal read-path failures
#[derive(Debug, Error)]
pub enum ReadError {
    /// Fetching a candidate page from the index failed
    #[error("search on {edge} at offset {offset} failed: {source}")]
    Search {
        /// Edge being searched
        edge: SearchEdge,
        /// Offset of the failed page
        offset: usize,
        /// Underlying collaborator error
        #[source]
        source: VerityError,
    },

    /// Loading candidates from the primary store failed
    #[error("loading {count} candidate(s) from the store failed: {source}")]
    Load {
        /// Number of ids in the failed load
        count: usize,
        /// Underlying collaborator error
        #[source]
        source: VerityError,
    },

    /// Executing a page's index repairs failed
    #[error("{ops} index repair(s) lost: {source}")]
    RepairLost {
        /// Number of deindex operations in the failed batch
        ops: usize,
        /// Underlying collaborator error
        #[source]
        source: VerityError,
    },
}

impl ReadError {
    /// Whether the failure happened while repairing the index
    pub fn is_repair_failure(&self) -> bool {
        matches!(self, ReadError::RepairLost { .. })
    }
}
