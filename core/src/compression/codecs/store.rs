//! Pass-through codec.

use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

pub struct StoreCompressor;
pub struct StoreDecompressor;

impl Compressor for StoreCompressor {
    fn codec(&self) -> CompressionCodec {
        CompressionCodec::Store
    }

    fn compress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        out.extend_from_slice(input);
        Ok(())
    }
}

impl Decompressor for StoreDecompressor {
    fn codec(&self) -> CompressionCodec {
        CompressionCodec::Store
    }

    fn decompress_block(
        &mut self,
        input: &[u8],
        max_len: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), CompressionError> {
        if input.len() > max_len {
            return Err(CompressionError::BlockTooLarge { have: input.len(), max: max_len });
        }
        out.extend_from_slice(input);
        Ok(())
    }
}
