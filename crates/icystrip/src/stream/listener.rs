//! Metadata listener
//!
//! The demuxer reports metadata blocks and session lifecycle through a
//! [`MetadataListener`]. Callbacks run synchronously on the thread driving
//! reads, inside the read that completed the block: a slow listener stalls
//! audio delivery. Listeners that need to do real work should hand events
//! off, e.g. through [`ChannelListener`].

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::DemuxError;
use crate::stream::metadata::IcyMetadata;

/// Why a stream session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source ended cleanly
    EndOfStream,
    /// The session was closed by its owner
    Closed,
    /// The source failed or the stream was truncated
    Failed,
}

/// Receiver of metadata and lifecycle notifications for one stream session.
pub trait MetadataListener {
    /// Called once for every non-empty metadata block.
    fn on_metadata(&mut self, metadata: &IcyMetadata);

    /// Called once when the session is opened.
    fn on_stream_started(&mut self) {}

    /// Called once when the session stops, whatever the reason.
    fn on_stream_stopped(&mut self, _reason: StopReason) {}

    /// Called when a read fails, before `on_stream_stopped(Failed)`.
    fn on_error(&mut self, _error: &DemuxError) {}
}

impl<L: MetadataListener + ?Sized> MetadataListener for &mut L {
    fn on_metadata(&mut self, metadata: &IcyMetadata) {
        (**self).on_metadata(metadata);
    }

    fn on_stream_started(&mut self) {
        (**self).on_stream_started();
    }

    fn on_stream_stopped(&mut self, reason: StopReason) {
        (**self).on_stream_stopped(reason);
    }

    fn on_error(&mut self, error: &DemuxError) {
        (**self).on_error(error);
    }
}

impl<L: MetadataListener + ?Sized> MetadataListener for Box<L> {
    fn on_metadata(&mut self, metadata: &IcyMetadata) {
        (**self).on_metadata(metadata);
    }

    fn on_stream_started(&mut self) {
        (**self).on_stream_started();
    }

    fn on_stream_stopped(&mut self, reason: StopReason) {
        (**self).on_stream_stopped(reason);
    }

    fn on_error(&mut self, error: &DemuxError) {
        (**self).on_error(error);
    }
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl MetadataListener for NoopListener {
    fn on_metadata(&mut self, _metadata: &IcyMetadata) {}
}

/// Listener calling a closure for each metadata block
pub struct FnListener<F>(F);

impl<F: FnMut(&IcyMetadata)> FnListener<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: FnMut(&IcyMetadata)> MetadataListener for FnListener<F> {
    fn on_metadata(&mut self, metadata: &IcyMetadata) {
        (self.0)(metadata);
    }
}

/// Event forwarded by [`ChannelListener`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Started,
    Metadata(IcyMetadata),
    Stopped(StopReason),
    Error(String),
}

/// Listener forwarding every notification over a channel.
///
/// Sending never blocks (the channel is unbounded), so the reading thread
/// is not held up by a slow consumer. Events are dropped once the receiver
/// is gone.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: Sender<StreamEvent>,
}

impl ChannelListener {
    pub fn new(tx: Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: StreamEvent) {
        let _ = self.tx.send(event);
    }
}

/// Create a [`ChannelListener`] and the receiving end of its channel.
pub fn channel_listener() -> (ChannelListener, Receiver<StreamEvent>) {
    let (tx, rx) = unbounded();
    (ChannelListener::new(tx), rx)
}

impl MetadataListener for ChannelListener {
    fn on_metadata(&mut self, metadata: &IcyMetadata) {
        self.send(StreamEvent::Metadata(metadata.clone()));
    }

    fn on_stream_started(&mut self) {
        self.send(StreamEvent::Started);
    }

    fn on_stream_stopped(&mut self, reason: StopReason) {
        self.send(StreamEvent::Stopped(reason));
    }

    fn on_error(&mut self, error: &DemuxError) {
        self.send(StreamEvent::Error(error.to_string()));
    }
}
