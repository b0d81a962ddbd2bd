//! ICY stream demuxer
//!
//! Wraps a byte source carrying an Icecast/Shoutcast stream and provides a
//! Read interface over the audio bytes only. Every `metaint` audio bytes the
//! source carries one metadata block:
//!
//! ```text
//! [metaint audio bytes][L][L * 16 bytes of NUL-padded metadata text][metaint audio bytes]...
//! ```
//!
//! Blocks are consumed inline, parsed, and handed to a [`MetadataListener`].
//! Everything runs on the caller's thread: a read blocks for as long as the
//! source blocks, and listener callbacks run inside that read.

use std::io::{self, Read};
use std::mem;

use tracing::{debug, trace, warn};

use crate::config::icy::{MAX_METAINT, METADATA_BLOCK_UNIT};
use crate::error::{DemuxError, Result};
use crate::stream::listener::{MetadataListener, StopReason};
use crate::stream::metadata::parse_block;
use crate::stream::types::{DemuxStats, ParserState, ReadOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Ended,
    Failed,
    Closed,
}

/// Source condition hit after audio was already copied to the caller's
/// buffer. Reported by the next read so those bytes are not lost.
enum Deferred {
    Eof,
    Error(io::Error),
}

/// Outcome of one state-machine step
enum Step {
    Audio(usize),
    Metadata,
    Eof,
}

/// ICY demuxer for one stream session.
///
/// The source is used through `R: Read`; pass `&mut source` to keep
/// ownership with the code that opened the connection. The demuxer never
/// closes its source.
///
/// A session is driven by one thread at a time; `read_audio` takes
/// `&mut self`, and there is no internal locking. To cancel a blocked read,
/// shut the underlying connection down from another thread; the read then
/// fails with an I/O error.
pub struct IcyDemuxer<R: Read, L: MetadataListener> {
    source: R,
    listener: L,
    metaint: usize,
    bytes_until_block: usize,
    state: ParserState,
    pending_body: usize,
    body: Vec<u8>,
    stats: DemuxStats,
    phase: Phase,
    deferred: Option<Deferred>,
}

impl<R: Read, L: MetadataListener> IcyDemuxer<R, L> {
    /// Open a session over `source`.
    ///
    /// `metaint` is the number of audio bytes between metadata blocks, as
    /// announced by the `icy-metaint` response header. 0 means the stream
    /// has no metadata and every byte is passed through untouched.
    pub fn open(source: R, metaint: usize, mut listener: L) -> Result<Self> {
        if metaint > MAX_METAINT {
            return Err(DemuxError::InvalidMetaint(metaint));
        }

        if metaint == 0 {
            debug!("Opening ICY stream without metadata, passing bytes through");
        } else {
            debug!(metaint, "Opening ICY stream");
        }
        listener.on_stream_started();

        Ok(Self {
            source,
            listener,
            metaint,
            bytes_until_block: metaint,
            state: ParserState::Audio,
            pending_body: 0,
            body: Vec::new(),
            stats: DemuxStats::default(),
            phase: Phase::Open,
            deferred: None,
        })
    }

    /// Read audio bytes into `buf`.
    ///
    /// Keeps reading until `buf` is full or the source ends or fails.
    /// Metadata blocks met on the way are consumed without producing audio,
    /// so one call may read any amount of metadata from the source.
    ///
    /// Returns [`ReadOutcome::EndOfStream`] once the source is exhausted
    /// between blocks; a call that only consumed metadata before the end
    /// returns `EndOfStream` as well. [`DemuxError::TruncatedMetadata`] is
    /// returned when the source ends inside a block. After any error the
    /// session is unusable and must be reopened.
    pub fn read_audio(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        match self.phase {
            Phase::Open => {}
            Phase::Ended => return Ok(ReadOutcome::EndOfStream),
            Phase::Failed => return Err(DemuxError::Failed),
            Phase::Closed => return Err(DemuxError::Closed),
        }

        match self.deferred.take() {
            Some(Deferred::Eof) => return self.finish_at_eof(),
            Some(Deferred::Error(e)) => return Err(self.fail(DemuxError::Io(e))),
            None => {}
        }

        if buf.is_empty() {
            return Ok(ReadOutcome::Audio(0));
        }

        let mut filled = 0;
        while filled < buf.len() {
            let step = match self.state {
                ParserState::Audio => self.step_audio(&mut buf[filled..]),
                ParserState::ReadingLength => self.step_length(),
                ParserState::ReadingBody => self.step_body(),
            };

            match step {
                Ok(Step::Audio(n)) => filled += n,
                Ok(Step::Metadata) => {}
                Ok(Step::Eof) if filled > 0 => {
                    self.deferred = Some(Deferred::Eof);
                    break;
                }
                Ok(Step::Eof) => return self.finish_at_eof(),
                Err(e) if filled > 0 => {
                    trace!(error = %e, filled, "Source failed after partial read, deferring error");
                    self.deferred = Some(Deferred::Error(e));
                    break;
                }
                Err(e) => return Err(self.fail(DemuxError::Io(e))),
            }
        }

        Ok(ReadOutcome::Audio(filled))
    }

    /// End the session.
    ///
    /// Releases the metadata buffer and reports `on_stream_stopped(Closed)`
    /// unless the session already stopped. Idempotent. The source is left
    /// open.
    pub fn close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }

        let was_open = self.phase == Phase::Open;
        self.phase = Phase::Closed;
        self.deferred = None;
        self.release_body();

        if was_open {
            debug!(
                audio_bytes = self.stats.audio_bytes,
                blocks = self.stats.blocks,
                "ICY stream closed"
            );
            self.listener.on_stream_stopped(StopReason::Closed);
        }
    }

    pub fn metaint(&self) -> usize {
        self.metaint
    }

    /// True when the stream carries no metadata
    pub fn is_passthrough(&self) -> bool {
        self.metaint == 0
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Audio bytes left before the next metadata length byte (0 in pass-through mode)
    pub fn bytes_until_next_block(&self) -> usize {
        self.bytes_until_block
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    fn step_audio(&mut self, out: &mut [u8]) -> io::Result<Step> {
        let want = if self.metaint == 0 {
            out.len()
        } else {
            out.len().min(self.bytes_until_block)
        };

        let n = read_retrying(&mut self.source, &mut out[..want])?;
        if n == 0 {
            return Ok(Step::Eof);
        }

        self.stats.audio_bytes += n as u64;
        if self.metaint > 0 {
            self.bytes_until_block -= n;
            if self.bytes_until_block == 0 {
                self.state = ParserState::ReadingLength;
            }
        }
        Ok(Step::Audio(n))
    }

    fn step_length(&mut self) -> io::Result<Step> {
        let mut len_byte = [0u8; 1];
        if read_retrying(&mut self.source, &mut len_byte)? == 0 {
            return Ok(Step::Eof);
        }
        self.stats.metadata_bytes += 1;

        let body_len = len_byte[0] as usize * METADATA_BLOCK_UNIT;
        if body_len == 0 {
            trace!("Empty metadata block");
            self.stats.empty_blocks += 1;
            self.resume_audio();
        } else {
            self.pending_body = body_len;
            self.body = Vec::with_capacity(body_len);
            self.state = ParserState::ReadingBody;
        }
        Ok(Step::Metadata)
    }

    fn step_body(&mut self) -> io::Result<Step> {
        let start = self.body.len();
        self.body.resize(start + self.pending_body, 0);

        let n = match read_retrying(&mut self.source, &mut self.body[start..]) {
            Ok(n) => n,
            Err(e) => {
                self.body.truncate(start);
                return Err(e);
            }
        };
        self.body.truncate(start + n);
        if n == 0 {
            return Ok(Step::Eof);
        }

        self.pending_body -= n;
        self.stats.metadata_bytes += n as u64;
        if self.pending_body == 0 {
            self.dispatch_block();
        }
        Ok(Step::Metadata)
    }

    fn dispatch_block(&mut self) {
        let raw = mem::take(&mut self.body);
        let metadata = parse_block(&raw);
        self.stats.blocks += 1;

        debug!(
            bytes = raw.len(),
            tags = metadata.len(),
            title = metadata.stream_title(),
            "Metadata block"
        );
        self.listener.on_metadata(&metadata);
        self.resume_audio();
    }

    fn resume_audio(&mut self) {
        self.bytes_until_block = self.metaint;
        self.state = ParserState::Audio;
    }

    fn release_body(&mut self) {
        self.body = Vec::new();
        self.pending_body = 0;
    }

    fn finish_at_eof(&mut self) -> Result<ReadOutcome> {
        if self.state == ParserState::ReadingBody {
            let received = self.body.len();
            let err = DemuxError::TruncatedMetadata {
                expected: received + self.pending_body,
                received,
            };
            return Err(self.fail(err));
        }

        debug!(
            audio_bytes = self.stats.audio_bytes,
            blocks = self.stats.blocks,
            "ICY stream ended"
        );
        self.phase = Phase::Ended;
        self.release_body();
        self.listener.on_stream_stopped(StopReason::EndOfStream);
        Ok(ReadOutcome::EndOfStream)
    }

    fn fail(&mut self, err: DemuxError) -> DemuxError {
        warn!(error = %err, "ICY stream failed");
        self.phase = Phase::Failed;
        self.release_body();
        self.listener.on_error(&err);
        self.listener.on_stream_stopped(StopReason::Failed);
        err
    }
}

fn read_retrying<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match source.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

impl<R: Read, L: MetadataListener> Read for IcyDemuxer<R, L> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_audio(buf)?.bytes())
    }
}

impl<R: Read, L: MetadataListener> Drop for IcyDemuxer<R, L> {
    fn drop(&mut self) {
        self.close();
    }
}
