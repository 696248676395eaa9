use bitflags::bitflags;
use thiserror::Error;

use crate::compression::CompressionCodec;
use crate::constants::FORMAT_VERSION;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StreamFlags: u16 {
        /// Every block was encoded without history from earlier blocks.
        const INDEPENDENT_BLOCKS = 0x0001;
    }
}

/// Fixed-size header opening every compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub version: u16,
    pub codec: CompressionCodec,
    pub flags: StreamFlags,
    pub block_size: u32,
    pub level: i32,
}

impl StreamHeader {
    pub const LEN: usize = 4  // magic
        + 2                  // version
        + 2                  // codec
        + 2                  // flags
        + 2                  // reserved
        + 4                  // block_size
        + 4;                 // level

    pub fn new(codec: CompressionCodec, block_size: u32, level: i32) -> Self {
        Self {
            version: FORMAT_VERSION,
            codec,
            flags: StreamFlags::INDEPENDENT_BLOCKS,
            block_size,
            level,
        }
    }
}

/// Per-block frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub payload_len: u32,
    /// CRC32 of the uncompressed block.
    pub checksum: u32,
}

impl FrameHeader {
    pub const LEN: usize = 4 + 4;
}

/// Stream summary written after the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trailer {
    pub block_count: u64,
    pub total_uncompressed: u64,
}

impl Trailer {
    pub const LEN: usize = 8 + 8;
    /// End marker plus trailer.
    pub const WIRE_LEN: usize = 4 + Self::LEN;
}

/// What the next length word announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTag {
    Frame { payload_len: u32 },
    End,
}

/// Upper bound on a payload encoding `block_size` bytes with any codec.
pub fn max_payload_len(block_size: usize) -> usize {
    block_size
        .saturating_add(block_size / 128)
        .saturating_add(1024)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("invalid stream magic: {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("unsupported codec id: 0x{0:04x}")]
    UnsupportedCodec(u16),

    #[error("unsupported stream flags: 0x{0:04x}")]
    UnsupportedFlags(u16),

    #[error("reserved header field is 0x{0:04x}, expected 0")]
    NonZeroReserved(u16),

    #[error("invalid block size in header: {0}")]
    InvalidBlockSize(u32),

    #[error("empty frame")]
    EmptyFrame,

    #[error("frame payload of {len} bytes exceeds bound {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("trailer reports {expected} blocks, stream holds {actual}")]
    BlockCountMismatch { expected: u64, actual: u64 },

    #[error("trailer reports {expected} uncompressed bytes, stream holds {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("unexpected data after trailer")]
    TrailingData,
}
