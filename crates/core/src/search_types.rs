//! Search and reconciliation types
//!
//! These types describe what flows along the read path:
//! - SearchQuery: what the caller asked for
//! - IndexHit: one raw row returned by the secondary index
//! - Candidate: a tentative, unverified reference to an entity version
//! - ReconciledResult: a verified id or entity plus its lineage path
//!
//! ## Candidate kinds
//!
//! The secondary index reports plain and geo candidates. Direct queries
//! (lookups by name or uuid) bypass the index and produce direct candidates
//! whose id is resolved against the primary store.

use crate::contract::Version;
use crate::types::Id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Which end of an edge the searched node sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// The node is the edge's source (searching outgoing edges)
    Source,
    /// The node is the edge's target (searching incoming edges)
    Target,
}

/// Index scope a candidate was found in
///
/// Also the precise target of a deindex repair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchEdge {
    /// Node the edge hangs off
    pub node_id: Id,
    /// Edge (relationship or collection) name
    pub edge_name: String,
    /// Role of `node_id` on the edge
    pub node_role: NodeRole,
}

impl SearchEdge {
    /// Create a search edge
    pub fn new(node_id: Id, edge_name: impl Into<String>, node_role: NodeRole) -> Self {
        Self {
            node_id,
            edge_name: edge_name.into(),
            node_role,
        }
    }

    /// Edge for a collection owned by `owner` (owner is the source)
    pub fn collection(owner: Id, collection: impl Into<String>) -> Self {
        Self::new(owner, collection, NodeRole::Source)
    }
}

impl fmt::Display for SearchEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.node_role {
            NodeRole::Source => "source",
            NodeRole::Target => "target",
        };
        write!(f, "{}/{}({})", self.node_id, self.edge_name, role)
    }
}

/// Lineage of a result: the chain of edges traversed to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePath {
    /// Node reached at this hop
    pub id: Id,
    /// Edge traversed to reach it
    pub edge_name: String,
    /// Previous hop, if any
    pub parent: Option<Arc<EdgePath>>,
}

impl EdgePath {
    /// Create a root hop
    pub fn root(id: Id, edge_name: impl Into<String>) -> Self {
        Self {
            id,
            edge_name: edge_name.into(),
            parent: None,
        }
    }

    /// Extend this path by one hop
    pub fn child(self: &Arc<Self>, id: Id, edge_name: impl Into<String>) -> Self {
        Self {
            id,
            edge_name: edge_name.into(),
            parent: Some(Arc::clone(self)),
        }
    }

    /// Number of hops in this path
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }
}

/// Field selection with optional renaming
///
/// `source` may be a dotted path into nested objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectFieldMapping {
    /// Source field name or dotted path
    pub source: String,
    /// Name the field is returned under
    pub target: String,
}

impl SelectFieldMapping {
    /// Select a field under its own name
    pub fn keep(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            target: name,
        }
    }

    /// Select a field under a new name
    pub fn rename(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Identifier in a direct query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectIdentifier {
    /// Look up by the entity's name field
    Name(String),
    /// Address by uuid
    Uuid(Uuid),
}

/// A query handed to the candidate producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchQuery {
    /// Query evaluated by the secondary index
    ///
    /// The query string is opaque to the core.
    Index {
        /// Entity type being searched
        entity_type: String,
        /// Index query string
        ql: String,
        /// Field selection applied to results
        select: Vec<SelectFieldMapping>,
    },
    /// Lookup by name or uuid against the primary store, bypassing the index
    Direct {
        /// Entity type being looked up
        entity_type: String,
        /// Names or uuids, in request order
        identifiers: Vec<DirectIdentifier>,
        /// Field selection applied to results
        select: Vec<SelectFieldMapping>,
    },
}

impl SearchQuery {
    /// Index query with no field selection
    pub fn index(entity_type: impl Into<String>, ql: impl Into<String>) -> Self {
        SearchQuery::Index {
            entity_type: entity_type.into(),
            ql: ql.into(),
            select: Vec::new(),
        }
    }

    /// Direct query with no field selection
    pub fn direct(entity_type: impl Into<String>, identifiers: Vec<DirectIdentifier>) -> Self {
        SearchQuery::Direct {
            entity_type: entity_type.into(),
            identifiers,
            select: Vec::new(),
        }
    }

    /// Attach a field selection
    pub fn with_select(mut self, mappings: Vec<SelectFieldMapping>) -> Self {
        match &mut self {
            SearchQuery::Index { select, .. } | SearchQuery::Direct { select, .. } => {
                *select = mappings
            }
        }
        self
    }

    /// Whether this query bypasses the index
    pub fn is_direct(&self) -> bool {
        matches!(self, SearchQuery::Direct { .. })
    }

    /// Entity type being queried
    pub fn entity_type(&self) -> &str {
        match self {
            SearchQuery::Index { entity_type, .. } | SearchQuery::Direct { entity_type, .. } => {
                entity_type
            }
        }
    }

    /// Field selection
    pub fn select(&self) -> &[SelectFieldMapping] {
        match self {
            SearchQuery::Index { select, .. } | SearchQuery::Direct { select, .. } => select,
        }
    }
}

/// One raw row returned by the secondary index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    /// Indexed entity id
    pub id: Id,
    /// Version the index row was written for
    pub version: Version,
    /// Distance from the query point, for geo queries
    pub distance: Option<f64>,
}

/// What kind of candidate this is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateKind {
    /// Ordinary index hit
    Plain,
    /// Geo index hit with computed distance
    Geo {
        /// Distance from the query point
        distance: f64,
    },
    /// Direct lookup by name; id resolved against the primary store
    DirectByName {
        /// Requested name
        name: String,
    },
    /// Direct lookup by uuid
    DirectByUuid {
        /// Requested uuid
        uuid: Uuid,
    },
}

impl CandidateKind {
    /// Whether this kind came from a direct query
    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            CandidateKind::DirectByName { .. } | CandidateKind::DirectByUuid { .. }
        )
    }
}

/// A tentative reference to an entity version, not yet verified
///
/// Candidates are never mutated after creation except to resolve the id of
/// a direct lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    entity_type: String,
    id: Option<Id>,
    /// Version the index reported
    pub version: Version,
    /// Index scope the candidate was found in
    pub edge: SearchEdge,
    /// Candidate kind
    pub kind: CandidateKind,
    /// Field selection requested by the query
    pub fields: Arc<[SelectFieldMapping]>,
    /// Lineage of the query that produced this candidate
    pub path: Option<Arc<EdgePath>>,
}

impl Candidate {
    /// Candidate from an index hit
    pub fn from_hit(hit: IndexHit, edge: SearchEdge, fields: Arc<[SelectFieldMapping]>) -> Self {
        let kind = match hit.distance {
            Some(distance) => CandidateKind::Geo { distance },
            None => CandidateKind::Plain,
        };
        Self {
            entity_type: hit.id.entity_type().to_string(),
            id: Some(hit.id),
            version: hit.version,
            edge,
            kind,
            fields,
            path: None,
        }
    }

    /// Unresolved direct candidate
    ///
    /// Direct candidates carry `Version::MIN`; they always validate against
    /// the store's current version once resolved.
    pub fn direct(
        entity_type: impl Into<String>,
        identifier: DirectIdentifier,
        edge: SearchEdge,
        fields: Arc<[SelectFieldMapping]>,
    ) -> Self {
        let kind = match identifier {
            DirectIdentifier::Name(name) => CandidateKind::DirectByName { name },
            DirectIdentifier::Uuid(uuid) => CandidateKind::DirectByUuid { uuid },
        };
        Self {
            entity_type: entity_type.into(),
            id: None,
            version: Version::MIN,
            edge,
            kind,
            fields,
            path: None,
        }
    }

    /// Attach a lineage path
    pub fn with_path(mut self, path: Arc<EdgePath>) -> Self {
        self.path = Some(path);
        self
    }

    /// Entity type the candidate refers to
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Resolved id, if known
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// Record the id a direct lookup resolved to
    pub fn resolve(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }
}

/// A repair mutation removing one stale index row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeindexOp {
    /// Index scope holding the row
    pub edge: SearchEdge,
    /// Indexed entity
    pub id: Id,
    /// Version the row was written for
    pub version: Version,
}

impl DeindexOp {
    /// Create a deindex operation
    pub fn new(edge: SearchEdge, id: Id, version: Version) -> Self {
        Self { edge, id, version }
    }
}

/// Unit of output from either reconciler
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledResult<T> {
    /// Verified id or entity
    pub value: T,
    /// Lineage of the query that produced it
    pub path: Option<Arc<EdgePath>>,
}

impl<T> ReconciledResult<T> {
    /// Create a result
    pub fn new(value: T, path: Option<Arc<EdgePath>>) -> Self {
        Self { value, path }
    }

    /// Map the value, keeping the path
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReconciledResult<U> {
        ReconciledResult {
            value: f(self.value),
            path: self.path,
        }
    }
}
