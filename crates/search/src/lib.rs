//! Read-path reconciliation for Verity
//!
//! The secondary index is eventually consistent with the primary store.
//! This crate turns index hits into results the store vouches for:
//!
//! - [`CandidateProducer`]: pages a query against the index, pull-based
//! - [`IdReconciler`]: lightweight policy, verified ids
//! - [`EntityReconciler`]: full policy with dedup, keep-stale, direct
//!   lookups and projection, verified entities
//! - [`execute_repairs`]: applies one page's deindex operations as a batch
//! - stream adapters composing the above
//!
//! Divergence between index and store is expected and never an error.
//! Only collaborator failures surface, as [`ReadError`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod options;
pub mod producer;
pub mod reconcile;
pub mod repair;
pub mod stats;
pub mod stream;

pub use error::ReadError;
pub use options::ReadOptions;
pub use producer::CandidateProducer;
pub use reconcile::{
    project, resolve_direct, DirectResolution, EntityReconciler, IdReconciler, PageOutcome,
    ReconciledPage,
};
pub use repair::execute_repairs;
pub use stats::ReadStats;
pub use stream::{reconcile_entities, reconcile_entity_pages, reconcile_id_pages, reconcile_ids};
