//! Query operations on [`EntityStore`]
//!
//! Streaming queries page through the index lazily and reconcile each page
//! as it is pulled. Paged queries fetch and reconcile exactly one page from
//! a caller-held offset and hand back the offset to resume from.

use super::EntityStore;
use futures::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;
use verity_core::{Entity, Id, ReconciledResult, SearchEdge, SearchQuery};
use verity_search::{
    reconcile_entity_pages, reconcile_id_pages, CandidateProducer, EntityReconciler,
    IdReconciler, ReadError, ReadOptions, ReadStats,
};

/// One reconciled page of a paged query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage<T> {
    /// Verified results
    pub results: Vec<ReconciledResult<T>>,
    /// What happened to the page's candidates
    pub stats: ReadStats,
    /// Offset of the next page; `None` once the index is exhausted
    pub next_offset: Option<usize>,
}

impl<T> QueryPage<T> {
    fn exhausted() -> Self {
        Self {
            results: Vec::new(),
            stats: ReadStats::default(),
            next_offset: None,
        }
    }
}

impl EntityStore {
    fn producer(&self, edge: SearchEdge, query: SearchQuery) -> CandidateProducer {
        let limit = self.config.read().query_limit;
        CandidateProducer::new(Arc::clone(&self.collaborators.index), edge, query, limit)
    }

    fn id_reconciler(&self) -> IdReconciler {
        IdReconciler::new(
            Arc::clone(&self.collaborators.store),
            Arc::clone(&self.collaborators.index),
        )
    }

    fn entity_reconciler(&self, options: &ReadOptions) -> EntityReconciler {
        let default_keep = self.config.read().keep_stale_entries;
        EntityReconciler::new(
            Arc::clone(&self.collaborators.store),
            Arc::clone(&self.collaborators.index),
        )
        .with_options(options, default_keep)
    }

    /// Stream verified ids for a query
    pub fn query_ids(
        &self,
        edge: SearchEdge,
        query: SearchQuery,
    ) -> impl Stream<Item = Result<ReconciledResult<Id>, ReadError>> + Send {
        let metrics = Arc::clone(&self.read_metrics);
        reconcile_id_pages(self.producer(edge, query).into_stream(), self.id_reconciler())
            .inspect_ok(move |page| metrics.record(&page.stats))
            .map_ok(|page| stream::iter(page.results.into_iter().map(Ok)))
            .try_flatten()
    }

    /// Stream verified entities for a query
    pub fn query_entities(
        &self,
        edge: SearchEdge,
        query: SearchQuery,
        options: ReadOptions,
    ) -> impl Stream<Item = Result<ReconciledResult<Entity>, ReadError>> + Send {
        let metrics = Arc::clone(&self.read_metrics);
        let reconciler = self.entity_reconciler(&options);
        reconcile_entity_pages(self.producer(edge, query).into_stream(), reconciler)
            .inspect_ok(move |page| metrics.record(&page.stats))
            .map_ok(|page| stream::iter(page.results.into_iter().map(Ok)))
            .try_flatten()
    }

    /// Reconcile one page of ids starting at `offset`
    pub async fn query_id_page(
        &self,
        edge: SearchEdge,
        query: SearchQuery,
        offset: usize,
    ) -> Result<QueryPage<Id>, ReadError> {
        let mut producer = self.producer(edge, query).with_offset(offset);
        let Some(page) = producer.next_page().await? else {
            return Ok(QueryPage::exhausted());
        };
        let page = self.id_reconciler().reconcile_page(page).await?;
        self.read_metrics.record(&page.stats);
        Ok(QueryPage {
            results: page.results,
            stats: page.stats,
            next_offset: (!producer.is_exhausted()).then(|| producer.offset()),
        })
    }

    /// Reconcile one page of entities starting at `offset`
    pub async fn query_page(
        &self,
        edge: SearchEdge,
        query: SearchQuery,
        options: ReadOptions,
        offset: usize,
    ) -> Result<QueryPage<Entity>, ReadError> {
        let mut producer = self.producer(edge, query).with_offset(offset);
        let Some(page) = producer.next_page().await? else {
            return Ok(QueryPage::exhausted());
        };
        let page = self.entity_reconciler(&options).reconcile_page(page).await?;
        self.read_metrics.record(&page.stats);
        Ok(QueryPage {
            results: page.results,
            stats: page.stats,
            next_offset: (!producer.is_exhausted()).then(|| producer.offset()),
        })
    }
}
