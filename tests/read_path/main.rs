//! Integration tests for the read path.
//!
//! Candidates come from the in-memory index, which is updated by hand so
//! tests can make it stale, ahead or duplicated at will. Reconciliation
//! runs through `EntityStore` queries.

#[path = "../common/mod.rs"]
mod common;

mod direct;
mod divergence;
mod paging;
mod projection;
