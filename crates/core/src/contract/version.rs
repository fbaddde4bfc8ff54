//! Version identifier types
//!
//! Every committed mutation of an entity is identified by a [`Version`].
//! Versions are time-ordered: they embed the microsecond timestamp at which
//! they were issued, so comparing two versions compares their issue times.
//!
//! ## Uniqueness
//!
//! A version also carries the node tag of the [`VersionGenerator`] that
//! issued it. Within one generator timestamps strictly increase, so two
//! versions from the same process are never equal. Across processes a
//! timestamp tie is broken by the node tag.
//!
//! ## Comparison
//!
//! `Ord` compares by timestamp first, then node. This is the only ordering
//! primitive the write and read pipelines use for conflict and staleness
//! decisions.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Time-ordered unique version identifier
///
/// ## Invariants
///
/// - Totally ordered by embedded timestamp, ties broken by node
/// - Versions issued by one generator strictly increase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    /// Microseconds since the Unix epoch
    timestamp: u64,
    /// Issuing generator tag
    node: u64,
}

impl Version {
    /// Smallest possible version; sorts before every issued version
    pub const MIN: Version = Version {
        timestamp: 0,
        node: 0,
    };

    /// Largest possible version; sorts after every issued version
    pub const MAX: Version = Version {
        timestamp: u64::MAX,
        node: u64::MAX,
    };

    /// Create a version from raw parts
    pub const fn from_parts(timestamp: u64, node: u64) -> Self {
        Version { timestamp, node }
    }

    /// Issue a new version from the process-wide generator
    ///
    /// Guaranteed greater than every version previously issued by this process.
    pub fn next() -> Self {
        GLOBAL_GENERATOR.next()
    }

    /// Embedded timestamp (microseconds since epoch)
    #[inline]
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Issuing generator tag
    #[inline]
    pub const fn node(&self) -> u64 {
        self.node
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}-{:016x}", self.timestamp, self.node)
    }
}

static GLOBAL_GENERATOR: Lazy<VersionGenerator> = Lazy::new(VersionGenerator::new);

/// Issues strictly increasing versions
///
/// Each generator has a random node tag. `next()` uses the wall clock when it
/// has advanced and otherwise bumps the last issued timestamp by one, so the
/// sequence is strictly increasing even when the clock stalls or steps back.
pub struct VersionGenerator {
    node: u64,
    last: AtomicU64,
}

impl VersionGenerator {
    /// Create a generator with a random node tag
    pub fn new() -> Self {
        Self::with_node(Uuid::new_v4().as_u64_pair().0)
    }

    /// Create a generator with an explicit node tag
    pub fn with_node(node: u64) -> Self {
        Self {
            node,
            last: AtomicU64::new(0),
        }
    }

    /// Issue the next version
    pub fn next(&self) -> Version {
        let now = now_micros();
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Version::from_parts(candidate, self.node),
                Err(observed) => last = observed,
            }
        }
    }

    /// The node tag stamped on issued versions
    pub fn node(&self) -> u64 {
        self.node
    }
}

impl Default for VersionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn now_micros() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or(0)
}
