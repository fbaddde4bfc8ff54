//! Integration tests for the write path.
//!
//! These exercise commit, conflict, rollback and mark end to end through
//! `EntityStore`, with failure points armed on the in-memory collaborators.
//! Stage-level behavior is unit tested in crates/concurrency.

#[path = "../common/mod.rs"]
mod common;

mod commits;
mod conflicts;
mod durable_log;
mod rollback;
