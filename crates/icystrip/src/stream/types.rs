//! Stream types
//!
//! Core types shared by the demuxer and its callers.

/// Where the demuxer is within the interleaved stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Passing audio bytes through
    Audio,
    /// Next source byte is a metadata length byte
    ReadingLength,
    /// Accumulating a metadata block body
    ReadingBody,
}

/// Result of a successful demuxer read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many audio bytes were written to the front of the buffer.
    /// Zero only when the caller's buffer was empty.
    Audio(usize),
    /// No more audio will ever be produced by this session
    EndOfStream,
}

impl ReadOutcome {
    pub fn bytes(self) -> usize {
        match self {
            ReadOutcome::Audio(n) => n,
            ReadOutcome::EndOfStream => 0,
        }
    }

    pub fn is_end(self) -> bool {
        self == ReadOutcome::EndOfStream
    }
}

/// Byte and block counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Audio bytes delivered to the caller
    pub audio_bytes: u64,
    /// Metadata bytes consumed from the source, length bytes included
    pub metadata_bytes: u64,
    /// Non-empty blocks parsed and dispatched
    pub blocks: u64,
    /// Zero-length blocks skipped
    pub empty_blocks: u64,
}
