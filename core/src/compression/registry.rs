//! Codec registry and factory functions.

use std::ops::RangeInclusive;

use crate::compression::codecs::{deflate, lz4, store, zstd};
use crate::compression::constants::*;
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInfo {
    pub codec: CompressionCodec,
    pub name: &'static str,
    pub default_level: i32,
    /// Accepted levels; `None` means the codec ignores the level.
    pub levels: Option<RangeInclusive<i32>>,
}

pub fn resolve(codec: CompressionCodec) -> CodecInfo {
    match codec {
        CompressionCodec::Store => CodecInfo {
            codec,
            name: codec.name(),
            default_level: DEFAULT_LEVEL_STORE,
            levels: None,
        },
        CompressionCodec::Deflate => CodecInfo {
            codec,
            name: codec.name(),
            default_level: DEFAULT_LEVEL_DEFLATE,
            levels: Some(DEFLATE_LEVELS),
        },
        CompressionCodec::Zstd => CodecInfo {
            codec,
            name: codec.name(),
            default_level: DEFAULT_LEVEL_ZSTD,
            levels: Some(::zstd::compression_level_range()),
        },
        CompressionCodec::Lz4 => CodecInfo {
            codec,
            name: codec.name(),
            default_level: DEFAULT_LEVEL_LZ4,
            levels: None,
        },
    }
}

pub fn resolve_id(codec_id: u16) -> Result<CodecInfo, CompressionError> {
    CompressionCodec::from_id(codec_id).map(resolve)
}

impl CodecInfo {
    /// Level actually used for `requested`, validated against the codec's range.
    pub fn effective_level(&self, requested: Option<i32>) -> Result<i32, CompressionError> {
        let level = requested.unwrap_or(self.default_level);
        match &self.levels {
            Some(range) if !range.contains(&level) => Err(CompressionError::InvalidLevel {
                codec: self.name,
                level,
                min: *range.start(),
                max: *range.end(),
            }),
            Some(_) => Ok(level),
            None => Ok(self.default_level),
        }
    }
}

pub fn create_compressor(codec: CompressionCodec, level: Option<i32>)
    -> Result<Box<dyn Compressor>, CompressionError>
{
    let level = resolve(codec).effective_level(level)?;
    match codec {
        CompressionCodec::Store => Ok(Box::new(store::StoreCompressor)),
        CompressionCodec::Deflate => Ok(Box::new(deflate::DeflateCompressor::new(level)?)),
        CompressionCodec::Zstd => Ok(Box::new(zstd::ZstdCompressor::new(level)?)),
        CompressionCodec::Lz4 => Ok(Box::new(lz4::Lz4Compressor)),
    }
}

pub fn create_decompressor(codec: CompressionCodec)
    -> Result<Box<dyn Decompressor>, CompressionError>
{
    match codec {
        CompressionCodec::Store => Ok(Box::new(store::StoreDecompressor)),
        CompressionCodec::Deflate => Ok(Box::new(deflate::DeflateDecompressor)),
        CompressionCodec::Zstd => Ok(Box::new(zstd::ZstdDecompressor::new()?)),
        CompressionCodec::Lz4 => Ok(Box::new(lz4::Lz4Decompressor)),
    }
}
