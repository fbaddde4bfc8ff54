//! Candidate reconciliation
//!
//! Two reconcilers check index candidates against the primary store, one
//! page at a time:
//!
//! | Reconciler | Output | Stale candidate | Dedup | Keep-stale |
//! |------------|--------|-----------------|-------|------------|
//! | [`IdReconciler`] | ids | deindex at store version, drop | no | no |
//! | [`EntityReconciler`] | entities | deindex at candidate version, drop | yes | optional |
//!
//! They are deliberately separate policies and are not meant to converge.
//!
//! Each reconciler splits a page into an I/O-free `evaluate` step, a fold
//! from (candidates, store snapshot) to (results, repairs), and an async
//! `reconcile_page` that loads the snapshot, evaluates, and executes the
//! repairs as one batch.

mod direct;
mod entities;
mod ids;
mod projection;

pub use direct::{resolve_direct, DirectResolution};
pub use entities::EntityReconciler;
pub use ids::IdReconciler;
pub use projection::project;

use crate::stats::ReadStats;
use verity_core::{DeindexOp, ReconciledResult};

/// Result of evaluating one page, before repairs run
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome<T> {
    /// Verified results, in candidate order
    pub results: Vec<ReconciledResult<T>>,
    /// Index repairs the page calls for
    pub repairs: Vec<DeindexOp>,
    /// What happened to each candidate
    pub stats: ReadStats,
}

impl<T> Default for PageOutcome<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            repairs: Vec::new(),
            stats: ReadStats::default(),
        }
    }
}

impl<T> PageOutcome<T> {
    pub(crate) fn repair(&mut self, op: DeindexOp) {
        self.stats.deindexed += 1;
        self.repairs.push(op);
    }

    pub(crate) fn accept(&mut self, result: ReconciledResult<T>) {
        self.stats.accepted += 1;
        self.results.push(result);
    }
}

/// One fully reconciled page, repairs applied
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledPage<T> {
    /// Verified results, in candidate order
    pub results: Vec<ReconciledResult<T>>,
    /// What happened to each candidate
    pub stats: ReadStats,
}
