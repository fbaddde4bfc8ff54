//! File-backed version log
//!
//! Every append or delete is encoded as a [`LogRecord`] and written to the
//! segment before the in-memory view is updated, so the view never shows a
//! marker that a crash could lose. On open the segment is replayed in file
//! order; a torn tail left by a crash is truncated.
//!
//! # Durability
//!
//! - `Standard`: each record is flushed to the OS
//! - `Always`: each record is fsynced before the call returns
//!
//! Segment writes run on tokio's blocking pool so an fsync never stalls
//! the executor thread driving the write pipeline.
//!
//! # Compaction
//!
//! Deletes are tombstones, so the segment only grows. [`FileVersionLog::compact`]
//! rewrites the live markers into a fresh segment and atomically renames it
//! over the old one.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use verity_core::{
    DurabilityMode, Id, LogEntry, Stage, Version, VersionLog, VerityError, VerityResult,
};

use crate::format::{LogRecord, LogSegment, ReadStopReason, SegmentHeader};

type Markers = HashMap<Id, BTreeMap<Version, Stage>>;

/// What replay found when the log was opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Records applied
    pub records_replayed: usize,
    /// Corrupted records skipped
    pub skipped_corrupted: usize,
    /// Bytes dropped from a torn tail
    pub bytes_truncated: u64,
}

/// Durable [`VersionLog`] over a single segment file
#[derive(Debug)]
pub struct FileVersionLog {
    dir: PathBuf,
    mode: DurabilityMode,
    segment: Arc<Mutex<LogSegment>>,
    markers: Arc<RwLock<Markers>>,
    recovery: RecoveryStats,
}

impl FileVersionLog {
    /// Open the log in `dir`, creating it if missing, and replay it
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if the segment header is invalid or a record
    /// passes its checksum but cannot be decoded.
    pub fn open(dir: &Path, mode: DurabilityMode) -> VerityResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = LogSegment::segment_path(dir);

        let mut segment = if path.exists() {
            LogSegment::open(&path).map_err(|e| {
                VerityError::corruption(format!(
                    "Failed to open version log '{}': {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            let header = SegmentHeader::new(*uuid::Uuid::new_v4().as_bytes(), now_micros());
            LogSegment::create(&path, header)?
        };

        let scan = segment.read_records()?;
        if let ReadStopReason::ParseError { offset, detail } = &scan.stop_reason {
            return Err(VerityError::corruption(format!(
                "Undecodable version log record at offset {}: {}",
                offset, detail
            )));
        }

        let mut recovery = RecoveryStats {
            records_replayed: scan.records.len(),
            skipped_corrupted: scan.skipped_corrupted,
            bytes_truncated: 0,
        };
        if scan.valid_end < segment.size() {
            recovery.bytes_truncated = segment.size() - scan.valid_end;
            tracing::warn!(
                target: "verity::log",
                path = %path.display(),
                bytes = recovery.bytes_truncated,
                reason = ?scan.stop_reason,
                "Truncating torn version log tail"
            );
            segment.truncate(scan.valid_end)?;
        }

        let mut markers = Markers::new();
        for record in scan.records {
            apply(&mut markers, record);
        }

        tracing::info!(
            target: "verity::log",
            path = %path.display(),
            records = recovery.records_replayed,
            ids = markers.len(),
            "Version log replayed"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            mode,
            segment: Arc::new(Mutex::new(segment)),
            markers: Arc::new(RwLock::new(markers)),
            recovery,
        })
    }

    /// What replay found on open
    pub fn recovery_stats(&self) -> &RecoveryStats {
        &self.recovery
    }

    /// Durability mode in effect
    pub fn durability(&self) -> DurabilityMode {
        self.mode
    }

    /// Current segment size in bytes
    pub fn segment_size(&self) -> u64 {
        self.segment.lock().size()
    }

    /// Rewrite live markers into a fresh segment
    ///
    /// Appends are blocked for the duration.
    pub fn compact(&self) -> VerityResult<()> {
        let mut segment = self.segment.lock();
        let markers = self.markers.read();

        let tmp_path = self.dir.join(format!(
            "{}.compact",
            crate::format::SEGMENT_FILE_NAME
        ));
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path)?;
        }
        let header = SegmentHeader::new(segment.header().store_uuid, now_micros());
        let mut fresh = LogSegment::create(&tmp_path, header)?;
        let mut written = 0usize;
        for (id, versions) in markers.iter() {
            for (version, stage) in versions {
                let record = LogRecord::Append(LogEntry::new(id.clone(), *version, *stage));
                fresh.write(&encode(&record)?)?;
                written += 1;
            }
        }
        fresh.sync()?;
        drop(fresh);

        let path = segment.path().to_path_buf();
        std::fs::rename(&tmp_path, &path)?;
        *segment = LogSegment::open(&path)?;

        tracing::info!(target: "verity::log", records = written, "Version log compacted");
        Ok(())
    }

    async fn write_record(&self, record: LogRecord) -> VerityResult<()> {
        let bytes = encode(&record)?;
        let segment = Arc::clone(&self.segment);
        let markers = Arc::clone(&self.markers);
        let mode = self.mode;
        tokio::task::spawn_blocking(move || -> VerityResult<()> {
            let mut segment = segment.lock();
            segment.write(&bytes)?;
            match mode {
                DurabilityMode::Standard => segment.flush()?,
                DurabilityMode::Always => segment.sync()?,
            }
            // Updated under the segment lock so the view matches file order
            apply(&mut markers.write(), record);
            Ok(())
        })
        .await
        .map_err(|e| VerityError::storage(format!("Version log write task failed: {}", e)))?
    }
}

#[async_trait]
impl VersionLog for FileVersionLog {
    async fn append(&self, entry: LogEntry) -> VerityResult<()> {
        tracing::trace!(target: "verity::log", id = %entry.id, version = %entry.version, stage = %entry.stage, "Append");
        self.write_record(LogRecord::Append(entry)).await
    }

    async fn load_recent(
        &self,
        id: &Id,
        from: Version,
        count: usize,
    ) -> VerityResult<Vec<LogEntry>> {
        let markers = self.markers.read();
        Ok(markers
            .get(id)
            .map(|versions| {
                versions
                    .range(..=from)
                    .rev()
                    .take(count)
                    .map(|(version, stage)| LogEntry::new(id.clone(), *version, *stage))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, id: &Id, version: Version) -> VerityResult<()> {
        let present = self
            .markers
            .read()
            .get(id)
            .map_or(false, |versions| versions.contains_key(&version));
        if !present {
            return Ok(());
        }
        self.write_record(LogRecord::Delete {
            id: id.clone(),
            version,
        })
        .await
    }

    async fn load_history(&self, id: &Id) -> VerityResult<Vec<LogEntry>> {
        self.load_recent(id, Version::MAX, usize::MAX).await
    }
}

fn apply(markers: &mut Markers, record: LogRecord) {
    match record {
        LogRecord::Append(entry) => {
            markers
                .entry(entry.id)
                .or_default()
                .insert(entry.version, entry.stage);
        }
        LogRecord::Delete { id, version } => {
            if let Some(versions) = markers.get_mut(&id) {
                versions.remove(&version);
                if versions.is_empty() {
                    markers.remove(&id);
                }
            }
        }
    }
}

fn encode(record: &LogRecord) -> VerityResult<Vec<u8>> {
    record
        .to_bytes()
        .map_err(|e| VerityError::Serialization(e.to_string()))
}

fn now_micros() -> u64 {
    chrono::Utc::now().timestamp_micros().max(0) as u64
}
