//! Failure injection for collaborator tests
//!
//! Every in-memory collaborator consults a shared [`FailPoints`] before doing
//! work. Arming a point makes the next matching call(s) fail with
//! `VerityError::Storage`, which is how tests drive the write pipeline into
//! rollback and the read pipeline into fatal errors.
//!
//! # Example
//!
//! ```ignore
//! let fail = FailPoints::new();
//! let log = InMemoryVersionLog::with_fail_points(fail.clone());
//! fail.arm(FailPoint::LogAppendCommitted, Trigger::Once);
//! // the next COMMITTED append fails, later ones succeed
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use verity_core::{VerityError, VerityResult};

/// An injectable failure site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Appending an ACTIVE marker
    LogAppendActive,
    /// Appending a COMMITTED marker
    LogAppendCommitted,
    /// Appending a ROLLBACK marker
    LogAppendRollback,
    /// Loading log entries
    LogLoad,
    /// Deleting a log entry
    LogDelete,
    /// Writing a claim
    ClaimWrite,
    /// Deleting a claim
    ClaimDelete,
    /// Loading claims
    ClaimLoad,
    /// Writing to the primary store
    StoreWrite,
    /// Loading from the primary store
    StoreLoad,
    /// Fetching a search page
    IndexSearch,
    /// Executing an index batch
    BatchExecute,
}

/// How often an armed point fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fire on the next call only
    Once,
    /// Fire on the next `n` calls
    Times(usize),
    /// Fire until disarmed
    Always,
}

/// Shared set of armed failure points
///
/// Cloning shares the underlying set, so one handle can arm failures for
/// every collaborator it was handed to.
#[derive(Debug, Clone, Default)]
pub struct FailPoints {
    armed: Arc<Mutex<HashMap<FailPoint, Trigger>>>,
}

impl FailPoints {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a failure point
    pub fn arm(&self, point: FailPoint, trigger: Trigger) {
        self.armed.lock().insert(point, trigger);
    }

    /// Disarm a failure point
    pub fn disarm(&self, point: FailPoint) {
        self.armed.lock().remove(&point);
    }

    /// Disarm everything
    pub fn clear(&self) {
        self.armed.lock().clear();
    }

    /// Fail if `point` is armed, consuming one firing
    pub fn check(&self, point: FailPoint) -> VerityResult<()> {
        let mut armed = self.armed.lock();
        let fire = match armed.get(&point).copied() {
            None => false,
            Some(Trigger::Always) => true,
            Some(Trigger::Once) | Some(Trigger::Times(0)) | Some(Trigger::Times(1)) => {
                armed.remove(&point);
                true
            }
            Some(Trigger::Times(n)) => {
                armed.insert(point, Trigger::Times(n - 1));
                true
            }
        };
        if fire {
            tracing::debug!(target: "verity::testing", ?point, "Injected failure");
            Err(VerityError::storage(format!("injected failure at {:?}", point)))
        } else {
            Ok(())
        }
    }
}
