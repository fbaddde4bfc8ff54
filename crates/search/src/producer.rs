//! Candidate producer
//!
//! Pages a query against the secondary index at increasing offsets and turns
//! every hit into a [`Candidate`]. Direct queries never touch the index:
//! their identifiers are paged out as unresolved direct candidates.
//!
//! The producer is pull-based. Nothing is fetched until a page is asked
//! for, and a page shorter than the limit marks the result set exhausted.
//! Dropping the producer (or the stream made from it) stops it; no further
//! search calls are issued.

use crate::error::ReadError;
use futures::stream::{self, Stream};
use std::sync::Arc;
use verity_core::{
    Candidate, EdgePath, SearchEdge, SearchQuery, SecondaryIndex, SelectFieldMapping,
};

/// Produces pages of candidates for one query
pub struct CandidateProducer {
    index: Arc<dyn SecondaryIndex>,
    edge: SearchEdge,
    query: SearchQuery,
    fields: Arc<[SelectFieldMapping]>,
    path: Option<Arc<EdgePath>>,
    limit: usize,
    offset: usize,
    exhausted: bool,
}

impl CandidateProducer {
    /// Create a producer starting at offset 0
    ///
    /// A `limit` of zero is treated as one.
    pub fn new(
        index: Arc<dyn SecondaryIndex>,
        edge: SearchEdge,
        query: SearchQuery,
        limit: usize,
    ) -> Self {
        let fields: Arc<[SelectFieldMapping]> = Arc::from(query.select().to_vec());
        Self {
            index,
            edge,
            query,
            fields,
            path: None,
            limit: limit.max(1),
            offset: 0,
            exhausted: false,
        }
    }

    /// Resume from a previously returned offset
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Replace the field selection carried by every candidate
    pub fn with_fields(mut self, fields: Vec<SelectFieldMapping>) -> Self {
        self.fields = Arc::from(fields);
        self
    }

    /// Attach a lineage path to every candidate
    pub fn with_path(mut self, path: Arc<EdgePath>) -> Self {
        self.path = Some(path);
        self
    }

    /// Offset the next page will be fetched from
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Page size
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether the last page was short
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether this producer emits direct candidates
    pub fn is_direct(&self) -> bool {
        self.query.is_direct()
    }

    /// Fetch the next page
    ///
    /// Returns `None` once the result set is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Candidate>>, ReadError> {
        if self.exhausted {
            return Ok(None);
        }
        let page = match &self.query {
            SearchQuery::Direct {
                entity_type,
                identifiers,
                ..
            } => identifiers
                .iter()
                .skip(self.offset)
                .take(self.limit)
                .map(|identifier| {
                    Candidate::direct(
                        entity_type.clone(),
                        identifier.clone(),
                        self.edge.clone(),
                        Arc::clone(&self.fields),
                    )
                })
                .collect::<Vec<_>>(),
            SearchQuery::Index { .. } => {
                let hits = self
                    .index
                    .search(&self.edge, &self.query, self.limit, self.offset)
                    .await
                    .map_err(|source| ReadError::Search {
                        edge: self.edge.clone(),
                        offset: self.offset,
                        source,
                    })?;
                hits.into_iter()
                    .map(|hit| Candidate::from_hit(hit, self.edge.clone(), Arc::clone(&self.fields)))
                    .collect()
            }
        };

        tracing::trace!(
            target: "verity::read",
            edge = %self.edge,
            offset = self.offset,
            count = page.len(),
            "Fetched candidate page"
        );
        self.offset += page.len();
        if page.len() < self.limit {
            self.exhausted = true;
        }
        if page.is_empty() {
            return Ok(None);
        }
        let page = match &self.path {
            Some(path) => page
                .into_iter()
                .map(|c| c.with_path(Arc::clone(path)))
                .collect(),
            None => page,
        };
        Ok(Some(page))
    }

    /// Turn the producer into a stream of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Candidate>, ReadError>> + Send {
        stream::try_unfold(self, |mut producer| async move {
            Ok(producer.next_page().await?.map(|page| (page, producer)))
        })
    }
}
