//! In-memory version log
//!
//! Per-id `BTreeMap<Version, Stage>` behind a `parking_lot::RwLock`. Because
//! the map is keyed by version, appending a marker for an existing
//! (id, version) supersedes the previous one, and newest-first reads are a
//! reverse range scan.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use verity_core::{Id, LogEntry, Stage, Version, VersionLog, VerityResult};

use crate::testing::{FailPoint, FailPoints};

/// In-memory [`VersionLog`]
#[derive(Debug, Default)]
pub struct InMemoryVersionLog {
    entries: RwLock<HashMap<Id, BTreeMap<Version, Stage>>>,
    fail: FailPoints,
    appends: AtomicU64,
    deletes: AtomicU64,
}

impl InMemoryVersionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty log consulting the given failure points
    pub fn with_fail_points(fail: FailPoints) -> Self {
        Self {
            fail,
            ..Self::default()
        }
    }

    /// Current stage of (id, version), if a marker exists
    pub fn stage_of(&self, id: &Id, version: Version) -> Option<Stage> {
        self.entries
            .read()
            .get(id)
            .and_then(|versions| versions.get(&version).copied())
    }

    /// Number of markers held for an id
    pub fn entry_count(&self, id: &Id) -> usize {
        self.entries.read().get(id).map_or(0, BTreeMap::len)
    }

    /// Number of appends accepted
    pub fn append_count(&self) -> u64 {
        self.appends.load(Ordering::Relaxed)
    }

    /// Number of delete calls accepted
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    fn fail_point_for(stage: Stage) -> FailPoint {
        match stage {
            Stage::Active => FailPoint::LogAppendActive,
            Stage::Committed => FailPoint::LogAppendCommitted,
            Stage::Rollback => FailPoint::LogAppendRollback,
        }
    }
}

#[async_trait]
impl VersionLog for InMemoryVersionLog {
    async fn append(&self, entry: LogEntry) -> VerityResult<()> {
        self.fail.check(Self::fail_point_for(entry.stage))?;
        self.entries
            .write()
            .entry(entry.id)
            .or_default()
            .insert(entry.version, entry.stage);
        self.appends.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn load_recent(
        &self,
        id: &Id,
        from: Version,
        count: usize,
    ) -> VerityResult<Vec<LogEntry>> {
        self.fail.check(FailPoint::LogLoad)?;
        let entries = self.entries.read();
        Ok(entries
            .get(id)
            .map(|versions| {
                versions
                    .range(..=from)
                    .rev()
                    .take(count)
                    .map(|(version, stage)| LogEntry::new(id.clone(), *version, *stage))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, id: &Id, version: Version) -> VerityResult<()> {
        self.fail.check(FailPoint::LogDelete)?;
        let mut entries = self.entries.write();
        if let Some(versions) = entries.get_mut(id) {
            versions.remove(&version);
            if versions.is_empty() {
                entries.remove(id);
            }
        }
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn load_history(&self, id: &Id) -> VerityResult<Vec<LogEntry>> {
        self.load_recent(id, Version::MAX, usize::MAX)
            .await
    }
}
