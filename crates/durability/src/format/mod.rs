//! On-disk format of the version log

pub mod log_record;
pub mod segment;

pub use log_record::{
    LogRecord, LogRecordError, SegmentHeader, LOG_RECORD_FORMAT_VERSION, SEGMENT_HEADER_SIZE,
    SEGMENT_MAGIC,
};
pub use segment::{LogSegment, ReadStopReason, SegmentReadResult, SEGMENT_FILE_NAME};
