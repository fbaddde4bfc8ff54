//! Stream adapters
//!
//! Compose a page stream (usually [`CandidateProducer::into_stream`]) with a
//! reconciler. Pages are reconciled one at a time, in order, only as the
//! consumer pulls; dropping the output stream stops the producer.
//!
//! [`CandidateProducer::into_stream`]: crate::CandidateProducer::into_stream

use crate::error::ReadError;
use crate::reconcile::{EntityReconciler, IdReconciler, ReconciledPage};
use futures::stream::{self, Stream, TryStreamExt};
use verity_core::{Candidate, Entity, Id, ReconciledResult};

/// Reconcile a page stream into pages of verified ids
pub fn reconcile_id_pages<S>(
    pages: S,
    reconciler: IdReconciler,
) -> impl Stream<Item = Result<ReconciledPage<Id>, ReadError>> + Send
where
    S: Stream<Item = Result<Vec<Candidate>, ReadError>> + Send,
{
    pages.and_then(move |page| {
        let reconciler = reconciler.clone();
        async move { reconciler.reconcile_page(page).await }
    })
}

/// Reconcile a page stream into verified ids
pub fn reconcile_ids<S>(
    pages: S,
    reconciler: IdReconciler,
) -> impl Stream<Item = Result<ReconciledResult<Id>, ReadError>> + Send
where
    S: Stream<Item = Result<Vec<Candidate>, ReadError>> + Send,
{
    reconcile_id_pages(pages, reconciler)
        .map_ok(|page| stream::iter(page.results.into_iter().map(Ok)))
        .try_flatten()
}

/// Reconcile a page stream into pages of verified entities
pub fn reconcile_entity_pages<S>(
    pages: S,
    reconciler: EntityReconciler,
) -> impl Stream<Item = Result<ReconciledPage<Entity>, ReadError>> + Send
where
    S: Stream<Item = Result<Vec<Candidate>, ReadError>> + Send,
{
    pages.and_then(move |page| {
        let reconciler = reconciler.clone();
        async move { reconciler.reconcile_page(page).await }
    })
}

/// Reconcile a page stream into verified entities
pub fn reconcile_entities<S>(
    pages: S,
    reconciler: EntityReconciler,
) -> impl Stream<Item = Result<ReconciledResult<Entity>, ReadError>> + Send
where
    S: Stream<Item = Result<Vec<Candidate>, ReadError>> + Send,
{
    reconcile_entity_pages(pages, reconciler)
        .map_ok(|page| stream::iter(page.results.into_iter().map(Ok)))
        .try_flatten()
}
