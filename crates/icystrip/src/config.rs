//! Configuration constants for icystrip

/// ICY wire-format configuration
pub mod icy {
    /// Metadata block sizes are expressed in units of this many bytes
    pub const METADATA_BLOCK_UNIT: usize = 16;

    /// Largest possible metadata body (length byte 255 × 16)
    pub const MAX_METADATA_BODY: usize = u8::MAX as usize * METADATA_BLOCK_UNIT;

    /// Largest accepted metadata interval (bytes of audio between blocks).
    /// Common server values are 8192-65536; 1 MiB is over a minute of 128 kbps audio.
    pub const MAX_METAINT: usize = 1024 * 1024;
}

/// Network-related configuration
pub mod network {
    /// User agent for HTTP requests
    pub const USER_AGENT: &str = concat!("icystrip/", env!("CARGO_PKG_VERSION"));

    /// Request header asking the server to interleave metadata
    pub const ICY_METADATA_HEADER: (&str, &str) = ("Icy-MetaData", "1");

    /// Response header carrying the metadata interval
    pub const ICY_METAINT_HEADER: &str = "icy-metaint";

    /// Connection timeout in seconds
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Command-line driver configuration
pub mod cli {
    /// Audio copy buffer size (bytes)
    pub const COPY_BUFFER_SIZE: usize = 8 * 1024;
}
