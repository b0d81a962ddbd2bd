//! Stream handling
//!
//! Demuxes ICY (Icecast/Shoutcast) streams: strips interleaved metadata
//! blocks from the audio, parses them, and reports them to a listener.

pub mod demuxer;
pub mod headers;
pub mod listener;
pub mod metadata;
pub mod types;

pub use demuxer::IcyDemuxer;
pub use headers::{parse_metaint, IcyHeaders};
pub use listener::{
    channel_listener, ChannelListener, FnListener, MetadataListener, NoopListener, StopReason,
    StreamEvent,
};
pub use metadata::{encode_block, parse_block, IcyMetadata, NowPlaying};
pub use types::{DemuxStats, ParserState, ReadOutcome};
