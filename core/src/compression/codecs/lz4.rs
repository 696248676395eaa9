//! LZ4 block codec (lz4_flex). Output carries a little-endian u32 size prefix.

use lz4_flex::block::{compress_prepend_size, decompress_size_prepended};

use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

const CODEC: CompressionCodec = CompressionCodec::Lz4;

pub struct Lz4Compressor;

pub struct Lz4Decompressor;

impl Compressor for Lz4Compressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn compress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        out.extend_from_slice(&compress_prepend_size(input));
        Ok(())
    }
}

impl Decompressor for Lz4Decompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn decompress_block(
        &mut self,
        input: &[u8],
        max_len: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CompressionError> {
        let prefix: [u8; 4] = input
            .get(..4)
            .and_then(|p| p.try_into().ok())
            .ok_or_else(|| CompressionError::process(CODEC, "missing size prefix"))?;

        // Check the declared size before lz4_flex allocates for it.
        let declared = u32::from_le_bytes(prefix) as usize;
        if declared > max_len {
            return Err(CompressionError::BlockTooLarge { have: declared, max: max_len });
        }

        let decompressed = decompress_size_prepended(input)
            .map_err(|e| CompressionError::process(CODEC, e))?;
        out.extend_from_slice(&decompressed);
        Ok(())
    }
}
