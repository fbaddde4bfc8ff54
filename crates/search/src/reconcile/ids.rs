//! Lightweight reconciler: candidates to verified ids
//!
//! Compares each candidate's version with the store's latest version and
//! nothing else. There is no deduplication and no keep-stale option; any
//! mismatch drops the candidate.

use super::{resolve_direct, PageOutcome, ReconciledPage};
use crate::error::ReadError;
use crate::repair::execute_repairs;
use std::cmp::Ordering;
use std::sync::Arc;
use verity_core::{
    Candidate, DeindexOp, Id, PrimaryStore, ReconciledResult, SecondaryIndex, VersionSet,
};

/// Reconciles candidate pages into verified ids
#[derive(Clone)]
pub struct IdReconciler {
    store: Arc<dyn PrimaryStore>,
    index: Arc<dyn SecondaryIndex>,
}

impl IdReconciler {
    /// Create a reconciler over a store and the index its candidates came from
    pub fn new(store: Arc<dyn PrimaryStore>, index: Arc<dyn SecondaryIndex>) -> Self {
        Self { store, index }
    }

    /// Check one page against a snapshot of store versions
    ///
    /// Performs no I/O. Candidates without an id are counted as unresolved
    /// and dropped.
    pub fn evaluate(&self, page: Vec<Candidate>, versions: &VersionSet) -> PageOutcome<Id> {
        let mut outcome = PageOutcome::default();

        for candidate in page {
            let Some(id) = candidate.id().cloned() else {
                outcome.stats.unresolved += 1;
                continue;
            };
            let Some(&stored) = versions.get(&id) else {
                outcome.stats.missing += 1;
                if candidate.kind.is_direct() {
                    tracing::error!(target: "verity::read", %id, "Direct lookup resolved to an id missing from the store");
                } else {
                    tracing::warn!(target: "verity::read", %id, version = %candidate.version, "Candidate missing from store");
                }
                continue;
            };

            if candidate.kind.is_direct() {
                outcome.accept(ReconciledResult::new(id, candidate.path));
                continue;
            }

            match stored.cmp(&candidate.version) {
                Ordering::Greater => {
                    tracing::debug!(
                        target: "verity::read",
                        %id,
                        candidate = %candidate.version,
                        stored = %stored,
                        "Stale index entry"
                    );
                    outcome.stats.stale += 1;
                    outcome.repair(DeindexOp::new(candidate.edge, id, stored));
                }
                Ordering::Less => {
                    tracing::warn!(
                        target: "verity::read",
                        %id,
                        candidate = %candidate.version,
                        stored = %stored,
                        "Index ahead of store"
                    );
                    outcome.stats.ahead += 1;
                }
                Ordering::Equal => outcome.accept(ReconciledResult::new(id, candidate.path)),
            }
        }
        outcome
    }

    /// Reconcile one page and apply its repairs
    ///
    /// # Errors
    ///
    /// Fails if the store load or the repair batch fails.
    pub async fn reconcile_page(&self, page: Vec<Candidate>) -> Result<ReconciledPage<Id>, ReadError> {
        let mut unresolved = 0;
        let mut duplicates = 0;
        let page = if page.iter().any(|c| c.kind.is_direct()) {
            let resolved = resolve_direct(self.store.as_ref(), page).await?;
            unresolved = resolved.unresolved;
            duplicates = resolved.duplicates;
            resolved.candidates
        } else {
            page
        };

        let ids: Vec<Id> = page.iter().filter_map(|c| c.id().cloned()).collect();
        let versions = if ids.is_empty() {
            VersionSet::new()
        } else {
            self.store
                .load_latest_versions(&ids)
                .await
                .map_err(|source| ReadError::Load {
                    count: ids.len(),
                    source,
                })?
        };

        let mut outcome = self.evaluate(page, &versions);
        outcome.stats.unresolved += unresolved;
        outcome.stats.duplicates += duplicates;
        execute_repairs(&self.index, &outcome.repairs).await?;
        Ok(ReconciledPage {
            results: outcome.results,
            stats: outcome.stats,
        })
    }
}
