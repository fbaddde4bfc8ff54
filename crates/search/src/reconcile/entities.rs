//! Full reconciler: candidates to verified entities
//!
//! Per page:
//!
//! 1. Direct candidates are resolved to ids (see [`resolve_direct`]); index
//!    candidates are deduplicated by id, keeping the newest version.
//! 2. The store's latest record for every remaining id is batch-loaded.
//! 3. Each candidate is checked against its record:
//!    - absent: dropped
//!    - deleted: deindexed at the candidate version, dropped
//!    - store newer: deindexed at the candidate version and dropped, or
//!      returned with the store's current data under keep-stale
//!    - candidate newer: dropped, index left alone
//!    - equal: returned
//! 4. The page's repairs execute as one batch.
//!
//! Direct candidates skip the version checks and never cause repairs.

use super::{project, resolve_direct, PageOutcome, ReconciledPage};
use crate::error::ReadError;
use crate::options::ReadOptions;
use crate::repair::execute_repairs;
use std::collections::HashMap;
use std::sync::Arc;
use verity_core::{
    Candidate, CandidateKind, DeindexOp, Entity, EntitySet, Field, FieldValue, Id, PrimaryStore,
    ReconciledResult, SecondaryIndex, SelectFieldMapping, DISTANCE_FIELD,
};

/// Reconciles candidate pages into verified entities
#[derive(Clone)]
pub struct EntityReconciler {
    store: Arc<dyn PrimaryStore>,
    index: Arc<dyn SecondaryIndex>,
    keep_stale: bool,
    projection: Option<Arc<[SelectFieldMapping]>>,
}

impl EntityReconciler {
    /// Create a reconciler that drops stale candidates
    pub fn new(store: Arc<dyn PrimaryStore>, index: Arc<dyn SecondaryIndex>) -> Self {
        Self {
            store,
            index,
            keep_stale: false,
            projection: None,
        }
    }

    /// Return stale-but-present entities instead of dropping them
    pub fn with_keep_stale(mut self, keep: bool) -> Self {
        self.keep_stale = keep;
        self
    }

    /// Override the field selection carried by candidates
    pub fn with_projection(mut self, mappings: Vec<SelectFieldMapping>) -> Self {
        self.projection = Some(Arc::from(mappings));
        self
    }

    /// Apply per-query options over a configured keep-stale default
    pub fn with_options(self, options: &ReadOptions, default_keep_stale: bool) -> Self {
        let keep = options.resolve_keep_stale(default_keep_stale);
        let this = self.with_keep_stale(keep);
        match &options.projection {
            Some(mappings) => this.with_projection(mappings.clone()),
            None => this,
        }
    }

    /// Whether stale candidates are kept
    pub fn keeps_stale(&self) -> bool {
        self.keep_stale
    }

    /// Check one page against a snapshot of store records
    ///
    /// Performs no I/O. Direct pages are expected to be resolved and
    /// deduplicated already; index pages are deduplicated here.
    pub fn evaluate(&self, page: Vec<Candidate>, entities: &EntitySet) -> PageOutcome<Entity> {
        let mut outcome = PageOutcome::default();
        let direct = page.iter().any(|c| c.kind.is_direct());
        let page = if direct {
            page
        } else {
            dedup_newest(page, entities, &mut outcome)
        };

        for candidate in page {
            let Some(id) = candidate.id().cloned() else {
                outcome.stats.unresolved += 1;
                continue;
            };
            let Some(stored) = entities.get(&id) else {
                outcome.stats.missing += 1;
                if direct {
                    tracing::error!(target: "verity::read", %id, "Direct lookup resolved to an id missing from the store");
                } else {
                    tracing::warn!(target: "verity::read", %id, version = %candidate.version, "Candidate missing from store");
                }
                continue;
            };

            let current = match &stored.entity {
                Some(entity) if !stored.is_deleted() => entity,
                _ => {
                    outcome.stats.deleted += 1;
                    tracing::debug!(target: "verity::read", %id, stored = %stored.version, "Candidate entity deleted");
                    if !direct {
                        outcome.repair(DeindexOp::new(candidate.edge.clone(), id, candidate.version));
                    }
                    continue;
                }
            };

            if !direct {
                if stored.version > candidate.version {
                    outcome.stats.stale += 1;
                    tracing::debug!(
                        target: "verity::read",
                        %id,
                        candidate = %candidate.version,
                        stored = %stored.version,
                        keep = self.keep_stale,
                        "Stale index entry"
                    );
                    if self.keep_stale {
                        outcome.stats.kept_stale += 1;
                    } else {
                        outcome.repair(DeindexOp::new(candidate.edge.clone(), id, candidate.version));
                        continue;
                    }
                } else if candidate.version > stored.version {
                    outcome.stats.ahead += 1;
                    tracing::warn!(
                        target: "verity::read",
                        %id,
                        candidate = %candidate.version,
                        stored = %stored.version,
                        "Index ahead of store"
                    );
                    continue;
                }
            }

            let entity = self.build(current, &candidate);
            outcome.accept(ReconciledResult::new(entity, candidate.path));
        }
        outcome
    }

    fn build(&self, current: &Entity, candidate: &Candidate) -> Entity {
        let mut entity = current.clone();
        if let CandidateKind::Geo { distance } = candidate.kind {
            entity.set_field(Field::new(DISTANCE_FIELD, FieldValue::Float(distance)));
        }
        let mappings = self.projection.as_ref().unwrap_or(&candidate.fields);
        if !mappings.is_empty() {
            let projected = project(entity.fields(), mappings);
            entity.set_fields(projected);
        }
        entity
    }

    /// Reconcile one page and apply its repairs
    ///
    /// # Errors
    ///
    /// Fails if a name lookup, the store load or the repair batch fails.
    pub async fn reconcile_page(
        &self,
        page: Vec<Candidate>,
    ) -> Result<ReconciledPage<Entity>, ReadError> {
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

        let mut ids: Vec<Id> = page.iter().filter_map(|c| c.id().cloned()).collect();
        ids.sort();
        ids.dedup();
        let entities = if ids.is_empty() {
            EntitySet::new()
        } else {
            self.store
                .load_latest_batch(&ids)
                .await
                .map_err(|source| ReadError::Load {
                    count: ids.len(),
                    source,
                })?
        };

        let mut outcome = self.evaluate(page, &entities);
        outcome.stats.unresolved += unresolved;
        outcome.stats.duplicates += duplicates;
        execute_repairs(&self.index, &outcome.repairs).await?;
        Ok(ReconciledPage {
            results: outcome.results,
            stats: outcome.stats,
        })
    }
}

/// Keep the newest candidate per id, in order of first appearance
///
/// A discarded duplicate is deindexed when the store holds the id at a
/// different version than the duplicate's.
fn dedup_newest(
    page: Vec<Candidate>,
    entities: &EntitySet,
    outcome: &mut PageOutcome<Entity>,
) -> Vec<Candidate> {
    let mut slots: HashMap<Id, usize> = HashMap::with_capacity(page.len());
    let mut kept: Vec<Candidate> = Vec::with_capacity(page.len());
    let mut discarded: Vec<Candidate> = Vec::new();

    for candidate in page {
        let Some(id) = candidate.id().cloned() else {
            kept.push(candidate);
            continue;
        };
        match slots.get(&id) {
            None => {
                slots.insert(id, kept.len());
                kept.push(candidate);
            }
            Some(&slot) if candidate.version > kept[slot].version => {
                discarded.push(std::mem::replace(&mut kept[slot], candidate));
            }
            Some(_) => discarded.push(candidate),
        }
    }

    for candidate in discarded {
        outcome.stats.duplicates += 1;
        let Some(id) = candidate.id().cloned() else {
            continue;
        };
        if let Some(stored) = entities.get(&id) {
            if stored.version != candidate.version {
                outcome.repair(DeindexOp::new(candidate.edge, id, candidate.version));
            }
        }
    }
    kept
}
