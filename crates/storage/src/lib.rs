//! In-memory collaborators for Verity
//!
//! This crate provides reference implementations of the four collaborator
//! traits defined in `verity-core`:
//! - ShardedEntityStore: DashMap-backed `PrimaryStore` with per-id version chains
//! - InMemoryVersionLog: `VersionLog` over per-id ordered maps
//! - InMemoryClaimStore: `UniqueClaimStore` keyed by canonical claim rows
//! - InMemoryIndex: `SecondaryIndex` with recorded searches and deindex batches
//!
//! Every implementation consults a shared [`testing::FailPoints`] so that
//! failure paths of the write and read pipelines can be exercised.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod sharded;
pub mod testing;
pub mod unique;
pub mod version_log;

pub use index::{InMemoryBatch, InMemoryIndex, SearchCall};
pub use sharded::{ShardedEntityStore, VersionChain};
pub use testing::{FailPoint, FailPoints, Trigger};
pub use unique::InMemoryClaimStore;
pub use version_log::InMemoryVersionLog;
