//! Segment file handle and record scanning.

use super::log_record::{
    record_len, LogRecord, LogRecordError, SegmentHeader, MAX_RECORD_LEN, SEGMENT_HEADER_SIZE,
};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Name of the segment file inside the data directory
pub const SEGMENT_FILE_NAME: &str = "version-log.seg";

/// Open segment file positioned for appending.
#[derive(Debug)]
pub struct LogSegment {
    file: File,
    path: PathBuf,
    header: SegmentHeader,
    write_position: u64,
}

impl LogSegment {
    /// Segment path inside `dir`.
    pub fn segment_path(dir: &Path) -> PathBuf {
        dir.join(SEGMENT_FILE_NAME)
    }

    /// Create a new segment at `path` and write its header.
    ///
    /// Fails if the file already exists.
    pub fn create(path: &Path, header: SegmentHeader) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.write_all(&header.to_bytes())?;
        file.sync_all()?;
        Ok(LogSegment {
            file,
            path: path.to_path_buf(),
            header,
            write_position: SEGMENT_HEADER_SIZE as u64,
        })
    }

    /// Open an existing segment, validating its header.
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut header_bytes = [0u8; SEGMENT_HEADER_SIZE];
        file.read_exact(&mut header_bytes)?;
        let header = SegmentHeader::from_bytes(&header_bytes);
        if !header.is_valid() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid version log header in '{}'", path.display()),
            ));
        }

        let write_position = file.seek(SeekFrom::End(0))?;
        Ok(LogSegment {
            file,
            path: path.to_path_buf(),
            header,
            write_position,
        })
    }

    /// Segment header.
    pub fn header(&self) -> &SegmentHeader {
        &self.header
    }

    /// Path of the segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size in bytes.
    pub fn size(&self) -> u64 {
        self.write_position
    }

    /// Append bytes at the end of the segment.
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.write_position))?;
        self.file.write_all(data)?;
        self.write_position += data.len() as u64;
        Ok(())
    }

    /// Flush written bytes to the OS.
    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    /// fsync the segment.
    pub fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }

    /// Truncate the segment at `position`.
    ///
    /// Used during replay to drop a torn tail.
    pub fn truncate(&mut self, position: u64) -> io::Result<()> {
        self.file.set_len(position)?;
        self.file.sync_all()?;
        self.write_position = position;
        Ok(())
    }

    /// Scan every record after the header.
    ///
    /// Stops at the first incomplete record. A record failing its checksum
    /// is skipped when its length prefix is plausible.
    pub fn read_records(&mut self) -> io::Result<SegmentReadResult> {
        let header_size = SEGMENT_HEADER_SIZE as u64;
        self.file.seek(SeekFrom::Start(header_size))?;
        let mut buffer = Vec::new();
        self.file.read_to_end(&mut buffer)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        let mut valid_end = header_size;
        let mut stop_reason = ReadStopReason::EndOfData;
        let mut skipped_corrupted = 0usize;

        while offset < buffer.len() {
            let remaining = &buffer[offset..];
            match LogRecord::from_bytes(remaining) {
                Ok((record, consumed)) => {
                    records.push(record);
                    offset += consumed;
                    valid_end = header_size + offset as u64;
                }
                Err(LogRecordError::InsufficientData) => {
                    stop_reason = ReadStopReason::PartialRecord;
                    break;
                }
                Err(LogRecordError::ChecksumMismatch { .. }) => {
                    match record_len(remaining) {
                        Ok(len) if len > 0 && len < MAX_RECORD_LEN && remaining.len() >= 4 + len => {
                            tracing::warn!(
                                target: "verity::log",
                                offset = offset,
                                "Skipping corrupted version log record (checksum mismatch)"
                            );
                            offset += 4 + len;
                            valid_end = header_size + offset as u64;
                            skipped_corrupted += 1;
                        }
                        _ => {
                            stop_reason = ReadStopReason::ChecksumMismatch { offset };
                            break;
                        }
                    }
                }
                Err(e) => {
                    stop_reason = ReadStopReason::ParseError {
                        offset,
                        detail: e.to_string(),
                    };
                    break;
                }
            }
        }

        Ok(SegmentReadResult {
            records,
            valid_end,
            stop_reason,
            skipped_corrupted,
        })
    }
}

/// Why a scan stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStopReason {
    /// Read every byte
    EndOfData,
    /// Incomplete record at the tail (expected after a crash)
    PartialRecord,
    /// Corrupted record whose boundary could not be determined
    ChecksumMismatch {
        /// Byte offset past the header
        offset: usize,
    },
    /// Checksum was valid but the record could not be decoded
    ParseError {
        /// Byte offset past the header
        offset: usize,
        /// Human-readable error description
        detail: String,
    },
}

/// Result of scanning a segment.
#[derive(Debug)]
pub struct SegmentReadResult {
    /// Valid records, in file order
    pub records: Vec<LogRecord>,
    /// Position where valid data ends
    pub valid_end: u64,
    /// Why the scan stopped
    pub stop_reason: ReadStopReason,
    /// Corrupted records skipped
    pub skipped_corrupted: usize,
}
