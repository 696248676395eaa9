use std::ops::RangeInclusive;

/// Stable codec IDs (u16) for the stream header.
pub mod codec_ids {
    pub const STORE: u16   = 0x0000;
    pub const DEFLATE: u16 = 0x0001;
    pub const ZSTD: u16    = 0x0002;
    pub const LZ4: u16     = 0x0003;
}

pub const DEFAULT_LEVEL_STORE: i32 = 0;
pub const DEFAULT_LEVEL_DEFLATE: i32 = 6;
pub const DEFAULT_LEVEL_ZSTD: i32 = 6;
pub const DEFAULT_LEVEL_LZ4: i32 = 0; // block mode has no levels

pub const DEFLATE_LEVELS: RangeInclusive<i32> = 0..=9;
