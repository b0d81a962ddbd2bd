//! ICY response headers
//!
//! Transport-agnostic parsing of the `icy-*` headers an Icecast/Shoutcast
//! server sends with its response. The caller supplies a lookup function
//! over whatever header map its HTTP client exposes.

use std::num::IntErrorKind;

use tracing::{debug, warn};

use crate::config::network::ICY_METAINT_HEADER;

/// Headers parsed from an ICY stream response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcyHeaders {
    /// Audio bytes between metadata blocks; 0 when the stream carries none
    pub metaint: usize,
    pub station_name: Option<String>,
    pub genre: Option<String>,
    pub station_url: Option<String>,
    pub description: Option<String>,
    pub content_type: Option<String>,
    pub bitrate: Option<u32>,
}

impl IcyHeaders {
    /// Parse headers through `lookup`, which is called with lower-case names.
    pub fn from_lookup<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let text = |name: &str| {
            lookup(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            metaint: parse_metaint(lookup(ICY_METAINT_HEADER)),
            station_name: text("icy-name"),
            genre: text("icy-genre"),
            station_url: text("icy-url"),
            description: text("icy-description"),
            content_type: text("content-type"),
            bitrate: lookup("icy-br").and_then(parse_bitrate),
        }
    }

    /// True when the server announced interleaved metadata
    pub fn has_metadata(&self) -> bool {
        self.metaint > 0
    }
}

/// Interpret an `icy-metaint` header value.
///
/// Absent, non-numeric, zero or negative values all disable metadata
/// handling and yield 0. Upper bounds are enforced when a demuxer is opened,
/// so a positive value too large to represent yields `usize::MAX` and is
/// rejected there instead of being mistaken for a stream without metadata.
pub fn parse_metaint(value: Option<&str>) -> usize {
    let Some(raw) = value else {
        debug!("Stream does not provide interleaved metadata");
        return 0;
    };

    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
        Ok(n) => {
            debug!(metaint = n, "Non-positive icy-metaint, metadata disabled");
            0
        }
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
            warn!(value = raw, "icy-metaint out of range");
            usize::MAX
        }
        Err(e) => {
            warn!(value = raw, error = %e, "icy-metaint cannot be parsed, metadata disabled");
            0
        }
    }
}

/// Some servers send "128,128" (bitrate per channel layout); take the first number.
fn parse_bitrate(raw: &str) -> Option<u32> {
    raw.split(',').next()?.trim().parse().ok()
}
