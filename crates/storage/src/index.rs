//! In-memory secondary index
//!
//! Rows are (id, version, distance) hits grouped by [`SearchEdge`], kept in
//! insertion order so paging is deterministic. The index is deliberately
//! dumb: it never consults the primary store, so tests can make it as stale
//! or as far ahead as they like.
//!
//! Every search call and every executed deindex is recorded, which is what
//! the reconciliation tests assert against.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use verity_core::{
    DeindexOp, Id, IndexBatch, IndexHit, SearchEdge, SearchQuery, SecondaryIndex, Version,
    VerityResult,
};

use crate::testing::{FailPoint, FailPoints};

/// One recorded search call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCall {
    /// Requested page size
    pub limit: usize,
    /// Requested offset
    pub offset: usize,
}

#[derive(Debug, Default)]
struct IndexState {
    rows: RwLock<HashMap<SearchEdge, Vec<IndexHit>>>,
    searches: Mutex<Vec<SearchCall>>,
    deindexed: Mutex<Vec<DeindexOp>>,
    batches_created: AtomicU64,
    batches_executed: AtomicU64,
    fail: FailPoints,
}

/// In-memory [`SecondaryIndex`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    state: Arc<IndexState>,
}

impl InMemoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index consulting the given failure points
    pub fn with_fail_points(fail: FailPoints) -> Self {
        Self {
            state: Arc::new(IndexState {
                fail,
                ..IndexState::default()
            }),
        }
    }

    /// Add a plain row
    pub fn index(&self, edge: &SearchEdge, id: &Id, version: Version) {
        self.insert(edge, IndexHit {
            id: id.clone(),
            version,
            distance: None,
        });
    }

    /// Add a geo row carrying a distance
    pub fn index_geo(&self, edge: &SearchEdge, id: &Id, version: Version, distance: f64) {
        self.insert(edge, IndexHit {
            id: id.clone(),
            version,
            distance: Some(distance),
        });
    }

    fn insert(&self, edge: &SearchEdge, hit: IndexHit) {
        self.state
            .rows
            .write()
            .entry(edge.clone())
            .or_default()
            .push(hit);
    }

    /// Rows currently held for an edge
    pub fn rows(&self, edge: &SearchEdge) -> Vec<IndexHit> {
        self.state
            .rows
            .read()
            .get(edge)
            .cloned()
            .unwrap_or_default()
    }

    /// Every search call received, in arrival order
    pub fn searches(&self) -> Vec<SearchCall> {
        self.state.searches.lock().clone()
    }

    /// Every deindex applied by an executed batch, in execution order
    pub fn deindexed(&self) -> Vec<DeindexOp> {
        self.state.deindexed.lock().clone()
    }

    /// Number of batches created
    pub fn batches_created(&self) -> u64 {
        self.state.batches_created.load(Ordering::Relaxed)
    }

    /// Number of batches executed
    pub fn batches_executed(&self) -> u64 {
        self.state.batches_executed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SecondaryIndex for InMemoryIndex {
    async fn search(
        &self,
        edge: &SearchEdge,
        query: &SearchQuery,
        limit: usize,
        offset: usize,
    ) -> VerityResult<Vec<IndexHit>> {
        self.state.searches.lock().push(SearchCall { limit, offset });
        self.state.fail.check(FailPoint::IndexSearch)?;
        let rows = self.state.rows.read();
        Ok(rows
            .get(edge)
            .map(|hits| {
                hits.iter()
                    .filter(|hit| hit.id.entity_type() == query.entity_type())
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create_batch(&self) -> Box<dyn IndexBatch> {
        self.state.batches_created.fetch_add(1, Ordering::Relaxed);
        Box::new(InMemoryBatch {
            state: Arc::clone(&self.state),
            ops: Vec::new(),
        })
    }
}

/// Batch of pending deindex operations against an [`InMemoryIndex`]
#[derive(Debug)]
pub struct InMemoryBatch {
    state: Arc<IndexState>,
    ops: Vec<DeindexOp>,
}

#[async_trait]
impl IndexBatch for InMemoryBatch {
    fn deindex(&mut self, edge: &SearchEdge, id: &Id, version: Version) {
        self.ops
            .push(DeindexOp::new(edge.clone(), id.clone(), version));
    }

    fn len(&self) -> usize {
        self.ops.len()
    }

    async fn execute(self: Box<Self>) -> VerityResult<()> {
        self.state.fail.check(FailPoint::BatchExecute)?;
        {
            let mut rows = self.state.rows.write();
            for op in &self.ops {
                if let Some(hits) = rows.get_mut(&op.edge) {
                    hits.retain(|hit| !(hit.id == op.id && hit.version == op.version));
                }
            }
        }
        self.state.deindexed.lock().extend(self.ops.iter().cloned());
        self.state.batches_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: "verity::index", ops = self.ops.len(), "Executed index batch");
        Ok(())
    }
}
