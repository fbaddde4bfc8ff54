//! Per-page reconciliation counters

use std::ops::AddAssign;

/// What happened to the candidates of one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Candidates that became results
    pub accepted: u64,
    /// Stale candidates (store newer than index)
    pub stale: u64,
    /// Stale candidates returned anyway under keep-stale
    pub kept_stale: u64,
    /// Candidates ahead of the store
    pub ahead: u64,
    /// Candidates absent from the store
    pub missing: u64,
    /// Candidates whose entity is deleted
    pub deleted: u64,
    /// Duplicate candidates discarded by deduplication
    pub duplicates: u64,
    /// Direct lookups that resolved to nothing
    pub unresolved: u64,
    /// Deindex operations issued
    pub deindexed: u64,
}

impl ReadStats {
    /// Total candidates that did not become results
    pub fn dropped(&self) -> u64 {
        self.stale - self.kept_stale + self.ahead + self.missing + self.deleted + self.duplicates
            + self.unresolved
    }
}

impl AddAssign for ReadStats {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.stale += other.stale;
        self.kept_stale += other.kept_stale;
        self.ahead += other.ahead;
        self.missing += other.missing;
        self.deleted += other.deleted;
        self.duplicates += other.duplicates;
        self.unresolved += other.unresolved;
        self.deindexed += other.deindexed;
    }
}
