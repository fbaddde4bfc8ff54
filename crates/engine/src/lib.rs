//! Entity store engine for Verity
//!
//! This crate orchestrates all lower layers:
//! - EntityStore: the facade callers use, with open/in_memory/builder
//! - WriteCoordinator: write pipeline plus lifecycle metrics
//! - ReadMetrics: reconciliation counters across queries
//!
//! The engine is the only component that knows about:
//! - `verity.toml` and the data directory
//! - Which collaborator implementations back a store
//! - How the candidate producer and reconcilers are composed per query

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod store;

pub use coordinator::{ReadMetrics, WriteCoordinator, WriteMetrics};
pub use store::{Collaborators, EntityStore, EntityStoreBuilder, QueryPage};
