//! icystrip: ICY metadata demuxer
//!
//! Strips interleaved Icecast/Shoutcast metadata from an audio byte stream
//! and reports now-playing updates.
//!
//! ## Quick start
//!
//! ```
//! use std::io::Read;
//! use icystrip::stream::{encode_block, FnListener, IcyDemuxer};
//!
//! let mut wire = b"abcd".to_vec();
//! wire.extend(encode_block([("StreamTitle", "Artist - Song")]).unwrap());
//! wire.extend(b"efgh");
//!
//! let listener = FnListener::new(|meta: &icystrip::stream::IcyMetadata| {
//!     println!("now playing: {:?}", meta.stream_title());
//! });
//! let mut demuxer = IcyDemuxer::open(&wire[..], 4, listener).unwrap();
//!
//! let mut audio = Vec::new();
//! demuxer.read_to_end(&mut audio).unwrap();
//! assert_eq!(audio, b"abcdefgh");
//! ```

pub mod config;
pub mod error;
pub mod stream;

pub use error::{DemuxError, Result};
