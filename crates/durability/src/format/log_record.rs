//! Version log segment file and record format.
//!
//! The log lives in a single segment file, `version-log.seg`, inside the
//! store's data directory.
//!
//! # Segment Layout
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ Segment Header (32 bytes)          │
//! ├────────────────────────────────────┤
//! │ Record 1                           │
//! ├────────────────────────────────────┤
//! │ Record 2                           │
//! ├────────────────────────────────────┤
//! │ ...                                │
//! └────────────────────────────────────┘
//! ```
//!
//! # Record Layout
//!
//! ```text
//! ┌─────────────────┬──────────────────┬─────────────────────────┬──────────┐
//! │ Length (4 bytes)│ Format Ver (1)   │ Body (MessagePack)      │ CRC32 (4)│
//! └─────────────────┴──────────────────┴─────────────────────────┴──────────┘
//! ```
//!
//! The length field covers format version, body and CRC. The CRC covers
//! format version and body.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use verity_core::{Id, LogEntry, Version};

/// Magic bytes identifying a version log segment: "VRTY"
pub const SEGMENT_MAGIC: [u8; 4] = *b"VRTY";

/// Current segment format version
pub const SEGMENT_FORMAT_VERSION: u32 = 1;

/// Size of segment header in bytes
pub const SEGMENT_HEADER_SIZE: usize = 32;

/// Current record format version
pub const LOG_RECORD_FORMAT_VERSION: u8 = 1;

/// Records longer than this are treated as garbage when skipping corruption
pub const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

/// Segment header (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Magic bytes: "VRTY"
    pub magic: [u8; 4],
    /// Format version for forward compatibility
    pub format_version: u32,
    /// Creation time (microseconds since epoch)
    pub created_at: u64,
    /// Store UUID, stable across compactions
    pub store_uuid: [u8; 16],
}

impl SegmentHeader {
    /// Create a new header.
    pub fn new(store_uuid: [u8; 16], created_at: u64) -> Self {
        SegmentHeader {
            magic: SEGMENT_MAGIC,
            format_version: SEGMENT_FORMAT_VERSION,
            created_at,
            store_uuid,
        }
    }

    /// Serialize header to bytes.
    pub fn to_bytes(&self) -> [u8; SEGMENT_HEADER_SIZE] {
        let mut bytes = [0u8; SEGMENT_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.format_version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.created_at.to_le_bytes());
        bytes[16..32].copy_from_slice(&self.store_uuid);
        bytes
    }

    /// Deserialize header from bytes.
    pub fn from_bytes(bytes: &[u8; SEGMENT_HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        let mut store_uuid = [0u8; 16];
        store_uuid.copy_from_slice(&bytes[16..32]);
        SegmentHeader {
            magic,
            format_version: read_u32(&bytes[4..8]),
            created_at: read_u64(&bytes[8..16]),
            store_uuid,
        }
    }

    /// Validate magic bytes and format version.
    pub fn is_valid(&self) -> bool {
        self.magic == SEGMENT_MAGIC && self.format_version == SEGMENT_FORMAT_VERSION
    }
}

/// One record in the version log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    /// A lifecycle marker; supersedes any earlier marker for the same key
    Append(LogEntry),
    /// Tombstone removing the marker for (id, version)
    Delete {
        /// Entity id
        id: Id,
        /// Version whose marker is removed
        version: Version,
    },
}

impl LogRecord {
    /// Serialize record to bytes.
    ///
    /// Format: length (4) + format_version (1) + body + crc32 (4)
    pub fn to_bytes(&self) -> Result<Vec<u8>, LogRecordError> {
        let body =
            rmp_serde::to_vec(self).map_err(|e| LogRecordError::Encode(e.to_string()))?;

        let mut payload = Vec::with_capacity(1 + body.len());
        payload.push(LOG_RECORD_FORMAT_VERSION);
        payload.extend_from_slice(&body);

        let crc = compute_crc(&payload);
        let total_len = payload.len() + 4;
        let mut record = Vec::with_capacity(4 + total_len);
        record.extend_from_slice(&(total_len as u32).to_le_bytes());
        record.extend_from_slice(&payload);
        record.extend_from_slice(&crc.to_le_bytes());
        Ok(record)
    }

    /// Deserialize one record from the front of `bytes`.
    ///
    /// Returns (record, bytes_consumed) on success.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), LogRecordError> {
        let length = record_len(bytes)?;
        if length < 5 {
            // Minimum: 1 byte format version + 4 bytes CRC
            return Err(LogRecordError::InvalidFormat);
        }
        if bytes.len() < 4 + length {
            return Err(LogRecordError::InsufficientData);
        }

        let payload = &bytes[4..4 + length - 4];
        let stored_crc = read_u32(&bytes[4 + length - 4..4 + length]);
        let computed_crc = compute_crc(payload);
        if computed_crc != stored_crc {
            return Err(LogRecordError::ChecksumMismatch {
                expected: stored_crc,
                computed: computed_crc,
            });
        }

        let format_version = payload[0];
        if format_version != LOG_RECORD_FORMAT_VERSION {
            return Err(LogRecordError::UnsupportedVersion(format_version));
        }

        let record = rmp_serde::from_slice(&payload[1..])
            .map_err(|e| LogRecordError::Decode(e.to_string()))?;
        Ok((record, 4 + length))
    }
}

/// Length prefix of the record at the front of `bytes`.
pub fn record_len(bytes: &[u8]) -> Result<usize, LogRecordError> {
    if bytes.len() < 4 {
        return Err(LogRecordError::InsufficientData);
    }
    Ok(read_u32(&bytes[0..4]) as usize)
}

fn compute_crc(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// Record parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogRecordError {
    /// Not enough data to parse record
    #[error("Insufficient data to parse record")]
    InsufficientData,

    /// Record format is invalid
    #[error("Invalid record format")]
    InvalidFormat,

    /// Checksum verification failed
    #[error("Checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Expected checksum from record
        expected: u32,
        /// Computed checksum
        computed: u32,
    },

    /// Unsupported format version
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),

    /// Body could not be encoded
    #[error("Record encode failed: {0}")]
    Encode(String),

    /// Body passed its checksum but could not be decoded
    #[error("Record decode failed: {0}")]
    Decode(String),
}
