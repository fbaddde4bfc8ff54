//! Version log entries
//!
//! The version log holds one entry per (id, version). An entry is never
//! rewritten in place; a later stage for the same key supersedes it.
//!
//! ```text
//! WriteStart ──► ACTIVE ──► WriteCommit ──► COMMITTED
//!                  │
//!                  └──► WriteOptimisticVerify (conflict) ──► ROLLBACK
//! ```

use super::Version;
use crate::types::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of one version of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Write in flight; not yet visible to readers
    Active,
    /// Write lost a conflict and is being compensated
    Rollback,
    /// Write is durable and authoritative
    Committed,
}

impl Stage {
    /// Whether this stage is terminal-success
    pub fn is_committed(&self) -> bool {
        matches!(self, Stage::Committed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Active => "ACTIVE",
            Stage::Rollback => "ROLLBACK",
            Stage::Committed => "COMMITTED",
        };
        f.write_str(s)
    }
}

/// A version lifecycle marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entity id
    pub id: Id,
    /// Version the marker describes
    pub version: Version,
    /// Lifecycle stage
    pub stage: Stage,
}

impl LogEntry {
    /// Create a log entry
    pub fn new(id: Id, version: Version, stage: Stage) -> Self {
        Self { id, version, stage }
    }
}
