//! Raw deflate via flate2. Each block is a complete deflate stream.

use std::io::{Read, Write};

use flate2::bufread::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

const CODEC: CompressionCodec = CompressionCodec::Deflate;

pub struct DeflateCompressor {
    level: Compression,
}

impl DeflateCompressor {
    /// `level` must already be validated (0..=9).
    pub fn new(level: i32) -> Result<Self, CompressionError> {
        let level = u32::try_from(level).map_err(|_| CompressionError::CodecInitFailed {
            codec: CODEC.name(),
            msg: format!("negative level {level}"),
        })?;
        Ok(Self { level: Compression::new(level) })
    }
}

impl Compressor for DeflateCompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn compress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let buf = std::mem::take(out);
        let mut enc = DeflateEncoder::new(buf, self.level);
        enc.write_all(input).map_err(|e| CompressionError::process(CODEC, e))?;
        *out = enc.finish().map_err(|e| CompressionError::process(CODEC, e))?;
        Ok(())
    }
}

pub struct DeflateDecompressor;

impl Decompressor for DeflateDecompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn decompress_block(
        &mut self,
        input: &[u8],
        max_len: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CompressionError> {
        let start = out.len();
        // One byte past the limit is enough to detect an oversized block.
        let mut dec = DeflateDecoder::new(input);
        (&mut dec)
            .take(max_len as u64 + 1)
            .read_to_end(out)
            .map_err(|e| CompressionError::process(CODEC, e))?;

        let produced = out.len() - start;
        if produced > max_len {
            out.truncate(start);
            return Err(CompressionError::BlockTooLarge { have: produced, max: max_len });
        }
        // The deflate stream must span the whole payload.
        if dec.total_in() != input.len() as u64 {
            out.truncate(start);
            return Err(CompressionError::process(
                CODEC,
                format!("{} trailing bytes after deflate stream", input.len() as u64 - dec.total_in()),
            ));
        }
        Ok(())
    }
}
