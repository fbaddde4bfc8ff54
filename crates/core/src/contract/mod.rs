//! Contract types for the persisted write-path records
//!
//! - Version / VersionGenerator: time-ordered version identifiers
//! - VersionedEntity / EntityStatus: an entity pinned to a version
//! - LogEntry / Stage: version lifecycle markers
//! - UniqueClaim: uniqueness claim rows

mod log_entry;
mod unique;
mod version;
mod versioned;

pub use log_entry::{LogEntry, Stage};
pub use unique::{claim_row_key, UniqueClaim};
pub use version::{Version, VersionGenerator};
pub use versioned::{EntitySet, EntityStatus, VersionSet, VersionedEntity};
