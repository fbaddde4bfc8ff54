//! Write path for Verity
//!
//! This crate turns entity mutations into committed versions:
//! - WritePipeline: WriteStart → unique verify → unique claim →
//!   optimistic verify → verify → commit, plus tombstone marks
//! - RollbackAction: compensating deletes for failed writes
//! - WriteError / WriteFailure: the write-side error taxonomy
//!
//! Conflict detection is optimistic and first-writer-wins: a write fails if
//! the log entry immediately preceding its own version is not COMMITTED.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod claims;
pub mod commit;
pub mod conflict;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod rollback;
pub mod start;
pub mod validation;

pub use context::WriteContext;
pub use error::{WriteError, WriteFailure};
pub use pipeline::{CommittedEntity, WritePipeline};
pub use rollback::{RollbackAction, RollbackReport};
