//! Durability layer for Verity
//!
//! This crate provides a persistent [`verity_core::VersionLog`]:
//! - format: segment header and length-prefixed, CRC32-checked records
//! - FileVersionLog: replay on open, torn-tail truncation, compaction

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file_log;
pub mod format;

pub use file_log::{FileVersionLog, RecoveryStats};
pub use format::{LogRecord, LogRecordError, LogSegment, SegmentHeader};
