//! ICY metadata types and block parsing
//!
//! A metadata block is NUL-padded text made of `KEY='VALUE';` entries, e.g.
//! `StreamTitle='Artist - Song';StreamUrl='http://example.com';`. Parsing is
//! pure and never fails: malformed entries are skipped one at a time.

use std::collections::hash_map::{self, HashMap};

use tracing::trace;

use crate::config::icy::{MAX_METADATA_BODY, METADATA_BLOCK_UNIT};
use crate::error::{DemuxError, Result};

/// Conventional tag carrying the now-playing title
pub const STREAM_TITLE: &str = "StreamTitle";

/// Conventional tag carrying a URL related to the current item
pub const STREAM_URL: &str = "StreamUrl";

/// Tags decoded from one metadata block.
///
/// Keys are case-sensitive as transmitted. When a block repeats a key, the
/// last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcyMetadata {
    tags: HashMap<String, String>,
}

impl IcyMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Value of the `StreamTitle` tag, if present
    pub fn stream_title(&self) -> Option<&str> {
        self.get(STREAM_TITLE)
    }

    /// Value of the `StreamUrl` tag, if present
    pub fn stream_url(&self) -> Option<&str> {
        self.get(STREAM_URL)
    }

    /// Artist/title split of `StreamTitle`
    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.stream_title().map(NowPlaying::from_title)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.tags.iter()
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.tags
    }
}

impl FromIterator<(String, String)> for IcyMetadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

/// Now-playing information with artist/title split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl NowPlaying {
    /// Split a `StreamTitle` value into artist and song.
    ///
    /// Stations announce "Artist - Song", so the first spaced hyphen is the
    /// boundary and hyphens inside names like "Jay-Z" are left alone. A title
    /// without that boundary is reported as the song. Stations send blank
    /// titles between tracks; those report neither field so a listener can
    /// keep showing the previous track.
    pub fn from_title(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self {
                title: None,
                artist: None,
            };
        }

        match raw.split_once(" - ") {
            Some((artist, title)) => Self {
                title: non_empty(title.trim()),
                artist: non_empty(artist.trim()),
            },
            None => Self {
                title: Some(raw.to_string()),
                artist: None,
            },
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Parse the raw bytes of one metadata block (NUL padding included).
///
/// Invalid UTF-8 is replaced rather than rejected. Entries that cannot be
/// decoded are skipped; every other key is passed through.
pub fn parse_block(raw: &[u8]) -> IcyMetadata {
    let end = raw
        .iter()
        .rposition(|&b| b != 0)
        .map(|p| p + 1)
        .unwrap_or(0);
    let text = String::from_utf8_lossy(&raw[..end]);

    let mut tags = HashMap::new();
    let mut rest: &str = &text;
    while !rest.is_empty() {
        rest = match parse_entry(rest) {
            Entry::Tag { key, value, rest } => {
                tags.insert(key.to_string(), value);
                rest
            }
            Entry::Empty { rest } => rest,
            Entry::Malformed { reason, rest } => {
                trace!(reason, "Skipping malformed metadata entry");
                rest
            }
        };
    }

    IcyMetadata { tags }
}

enum Entry<'a> {
    Tag {
        key: &'a str,
        value: String,
        rest: &'a str,
    },
    Empty {
        rest: &'a str,
    },
    Malformed {
        reason: &'static str,
        rest: &'a str,
    },
}

fn parse_entry(input: &str) -> Entry<'_> {
    if let Some(rest) = input.strip_prefix(';') {
        return Entry::Empty { rest };
    }

    let Some(eq) = input.find('=') else {
        return Entry::Malformed {
            reason: "missing '='",
            rest: "",
        };
    };
    if let Some(semi) = input[..eq].find(';') {
        return Entry::Malformed {
            reason: "missing '='",
            rest: &input[semi + 1..],
        };
    }

    // servers often separate entries with "; "
    let key = input[..eq].trim_start_matches(|c: char| c.is_ascii_whitespace());
    let after_eq = &input[eq + 1..];
    if key.is_empty() {
        return Entry::Malformed {
            reason: "empty key",
            rest: skip_past_semicolon(after_eq),
        };
    }

    let Some(quoted) = after_eq.strip_prefix('\'') else {
        return Entry::Malformed {
            reason: "missing opening quote",
            rest: skip_past_semicolon(after_eq),
        };
    };

    match scan_quoted(quoted) {
        Some((value, rest)) => Entry::Tag { key, value, rest },
        None => Entry::Malformed {
            reason: "unterminated value",
            rest: "",
        },
    }
}

fn skip_past_semicolon(s: &str) -> &str {
    s.find(';').map(|i| &s[i + 1..]).unwrap_or("")
}

/// Scan a quoted value starting just after its opening quote.
///
/// The value ends at a quote followed by `;` or by the end of the text. `''`
/// is an escaped quote; any other lone quote is kept as-is.
fn scan_quoted(body: &str) -> Option<(String, &str)> {
    let bytes = body.as_bytes();
    let mut value = String::new();
    let mut start = 0;
    let mut i = 0;

    while let Some(off) = body[i..].find('\'') {
        let q = i + off;
        match bytes.get(q + 1) {
            Some(b'\'') => {
                value.push_str(&body[start..=q]);
                i = q + 2;
                start = i;
            }
            Some(b';') => {
                value.push_str(&body[start..q]);
                return Some((value, &body[q + 2..]));
            }
            None => {
                value.push_str(&body[start..q]);
                return Some((value, ""));
            }
            Some(_) => i = q + 1,
        }
    }

    None
}

/// Encode tags into a wire-format metadata block: length byte, then the
/// `KEY='VALUE';` text NUL-padded to a multiple of 16 bytes.
///
/// Quotes inside values are doubled. Keys must not contain `=` or `;`. No
/// entries encode to the single zero byte of an empty block.
pub fn encode_block<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut text = String::new();
    for (key, value) in entries {
        text.push_str(key);
        text.push_str("='");
        text.push_str(&value.replace('\'', "''"));
        text.push_str("';");
    }

    if text.len() > MAX_METADATA_BODY {
        return Err(DemuxError::MetadataTooLarge(text.len()));
    }

    let units = text.len().div_ceil(METADATA_BLOCK_UNIT);
    let padded_len = units * METADATA_BLOCK_UNIT;

    let mut block = Vec::with_capacity(padded_len + 1);
    block.push(units as u8);
    block.extend_from_slice(text.as_bytes());
    block.resize(padded_len + 1, 0);
    Ok(block)
}
