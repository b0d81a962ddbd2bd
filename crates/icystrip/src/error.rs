//! Error types for icystrip
//!
//! Centralized error handling using thiserror.

use std::io;

use thiserror::Error;

/// Main error type for the ICY demuxer
#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source ended after a block's length byte but before its body was complete.
    #[error("Stream ended inside a metadata block ({received} of {expected} bytes)")]
    TruncatedMetadata { expected: usize, received: usize },

    #[error("Metadata interval {0} exceeds the supported maximum")]
    InvalidMetaint(usize),

    #[error("Metadata block body of {0} bytes does not fit in a single block")]
    MetadataTooLarge(usize),

    #[error("Stream session is closed")]
    Closed,

    #[error("Stream session failed and must be reopened")]
    Failed,
}

impl DemuxError {
    /// True when the stream died in the middle of a metadata block.
    ///
    /// Callers usually treat this as a dropped connection rather than the end
    /// of playback.
    pub fn is_truncation(&self) -> bool {
        matches!(self, DemuxError::TruncatedMetadata { .. })
    }
}

impl From<DemuxError> for io::Error {
    fn from(err: DemuxError) -> Self {
        match err {
            DemuxError::Io(e) => e,
            DemuxError::TruncatedMetadata { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            DemuxError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            DemuxError::InvalidMetaint(_) | DemuxError::MetadataTooLarge(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            DemuxError::Failed => io::Error::other(err),
        }
    }
}

/// Result type alias for icystrip
pub type Result<T> = std::result::Result<T, DemuxError>;
