use std::fmt;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compression::constants::codec_ids;
use crate::utils::enum_name_or_hex;

/// Codec identifier as stored in the stream header.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    Store   = codec_ids::STORE,
    Deflate = codec_ids::DEFLATE,
    Zstd    = codec_ids::ZSTD,
    Lz4     = codec_ids::LZ4,
}

impl CompressionCodec {
    pub const ALL: [CompressionCodec; 4] = [
        CompressionCodec::Store,
        CompressionCodec::Deflate,
        CompressionCodec::Zstd,
        CompressionCodec::Lz4,
    ];

    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn from_id(raw: u16) -> Result<Self, CompressionError> {
        Self::try_from_primitive(raw).map_err(|_| CompressionError::UnsupportedCodec { codec_id: raw })
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionCodec::Store   => "store",
            CompressionCodec::Deflate => "deflate",
            CompressionCodec::Zstd    => "zstd",
            CompressionCodec::Lz4     => "lz4",
        }
    }
}

impl Default for CompressionCodec {
    fn default() -> Self {
        CompressionCodec::Deflate
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("unsupported compression codec: {}", enum_name_or_hex::<CompressionCodec>(*codec_id))]
    UnsupportedCodec { codec_id: u16 },

    #[error("codec {codec}: level {level} outside {min}..={max}")]
    InvalidLevel { codec: &'static str, level: i32, min: i32, max: i32 },

    #[error("codec {codec} init failed: {msg}")]
    CodecInitFailed { codec: &'static str, msg: String },

    #[error("codec {codec} process failed: {msg}")]
    CodecProcessFailed { codec: &'static str, msg: String },

    #[error("block too large: {have} > {max}")]
    BlockTooLarge { have: usize, max: usize },
}

impl CompressionError {
    pub(crate) fn process(codec: CompressionCodec, err: impl fmt::Display) -> Self {
        CompressionError::CodecProcessFailed { codec: codec.name(), msg: err.to_string() }
    }
}

/// Encodes one block. Implementations must not carry history between calls.
pub trait Compressor: Send {
    fn codec(&self) -> CompressionCodec;

    /// Append the encoding of `input` to `out`.
    fn compress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
}

pub trait Decompressor: Send {
    fn codec(&self) -> CompressionCodec;

    /// Append the decoding of `input` to `out`.
    ///
    /// Fails with [`CompressionError::BlockTooLarge`] rather than produce more
    /// than `max_len` bytes.
    fn decompress_block(
        &mut self,
        input: &[u8],
        max_len: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CompressionError>;
}
