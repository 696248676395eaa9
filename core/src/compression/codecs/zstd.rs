//! Zstd block codec.
//!
//! Uses the bulk API: every block becomes one standalone zstd frame that
//! records its content size, so decoding needs no state from neighbours.

use zstd::bulk::{Compressor as BulkCompressor, Decompressor as BulkDecompressor};

use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

const CODEC: CompressionCodec = CompressionCodec::Zstd;

pub struct ZstdCompressor {
    inner: BulkCompressor<'static>,
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Result<Self, CompressionError> {
        let inner = BulkCompressor::new(level).map_err(|e| CompressionError::CodecInitFailed {
            codec: CODEC.name(),
            msg: e.to_string(),
        })?;
        Ok(Self { inner })
    }
}

impl Compressor for ZstdCompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn compress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let compressed = self
            .inner
            .compress(input)
            .map_err(|e| CompressionError::process(CODEC, e))?;
        out.extend_from_slice(&compressed);
        Ok(())
    }
}

pub struct ZstdDecompressor {
    inner: BulkDecompressor<'static>,
}

impl ZstdDecompressor {
    pub fn new() -> Result<Self, CompressionError> {
        let inner = BulkDecompressor::new().map_err(|e| CompressionError::CodecInitFailed {
            codec: CODEC.name(),
            msg: e.to_string(),
        })?;
        Ok(Self { inner })
    }
}

impl Decompressor for ZstdDecompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn decompress_block(
        &mut self,
        input: &[u8],
        max_len: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CompressionError> {
        // Capacity is a hard limit: larger content fails inside zstd.
        let decompressed = self
            .inner
            .decompress(input, max_len)
            .map_err(|e| CompressionError::process(CODEC, e))?;
        out.extend_from_slice(&decompressed);
        Ok(())
    }
}
