// Per-block codec behavior across every registered codec:
//
// * compress -> decompress restores the block
// * blocks carry no history (same input, same output, any call order)
// * size limits and corrupt payloads are reported, never panicked on
// * level validation through the registry

#[cfg(test)]
mod tests {
    use blockpress_core::compression::{
        create_compressor, create_decompressor, resolve, resolve_id, CompressionCodec,
        CompressionError,
    };

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn sample_block(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 ^ (i / 7) as u8).collect()
    }

    fn compress(codec: CompressionCodec, level: Option<i32>, input: &[u8]) -> Vec<u8> {
        let mut c = create_compressor(codec, level).unwrap();
        let mut out = Vec::new();
        c.compress_block(input, &mut out).unwrap();
        out
    }

    fn decompress(codec: CompressionCodec, payload: &[u8], max_len: usize) -> Result<Vec<u8>, CompressionError> {
        let mut d = create_decompressor(codec).unwrap();
        let mut out = Vec::new();
        d.decompress_block(payload, max_len, &mut out)?;
        Ok(out)
    }

    // ---------------------------------------------------------------------
    // Tests
    // ---------------------------------------------------------------------

    #[test]
    fn every_codec_restores_the_block() {
        let block = sample_block(64 * 1024);
        for codec in CompressionCodec::ALL {
            let payload = compress(codec, None, &block);
            assert!(!payload.is_empty(), "{codec}: empty payload");
            let restored = decompress(codec, &payload, block.len()).unwrap();
            assert_eq!(restored, block, "{codec}: round trip mismatch");
        }
    }

    #[test]
    fn single_byte_block() {
        for codec in CompressionCodec::ALL {
            let payload = compress(codec, None, b"x");
            assert_eq!(decompress(codec, &payload, 1).unwrap(), b"x");
        }
    }

    #[test]
    fn compressor_keeps_no_history_between_blocks() {
        let a = sample_block(8 * 1024);
        let b = vec![0x41u8; 8 * 1024];
        for codec in CompressionCodec::ALL {
            let mut c = create_compressor(codec, None).unwrap();

            let mut first_b = Vec::new();
            c.compress_block(&b, &mut first_b).unwrap();

            let mut fresh = create_compressor(codec, None).unwrap();
            let mut scratch = Vec::new();
            fresh.compress_block(&a, &mut scratch).unwrap();
            let mut second_b = Vec::new();
            fresh.compress_block(&b, &mut second_b).unwrap();

            assert_eq!(first_b, second_b, "{codec}: output depends on earlier blocks");
        }
    }

    #[test]
    fn repetitive_input_shrinks() {
        let block = vec![0x41u8; 128 * 1024];
        for codec in [CompressionCodec::Deflate, CompressionCodec::Zstd, CompressionCodec::Lz4] {
            let payload = compress(codec, None, &block);
            assert!(payload.len() < block.len() / 10, "{codec}: {} bytes", payload.len());
        }
    }

    #[test]
    fn oversized_output_is_rejected() {
        let block = vec![7u8; 4096];
        for codec in CompressionCodec::ALL {
            let payload = compress(codec, None, &block);
            match decompress(codec, &payload, 1024) {
                Err(CompressionError::BlockTooLarge { max, .. }) => assert_eq!(max, 1024),
                Err(CompressionError::CodecProcessFailed { .. }) if codec == CompressionCodec::Zstd => {}
                other => panic!("{codec}: unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn corrupt_payload_is_an_error() {
        let garbage = [0xFFu8; 32];
        for codec in [CompressionCodec::Deflate, CompressionCodec::Zstd, CompressionCodec::Lz4] {
            assert!(decompress(codec, &garbage, 1024).is_err(), "{codec}: garbage accepted");
        }
    }

    #[test]
    fn deflate_rejects_bytes_after_the_stream() {
        let input = sample_block(1000);
        let mut payload = compress(CompressionCodec::Deflate, None, &input);
        assert_eq!(decompress(CompressionCodec::Deflate, &payload, 1000).unwrap(), input);

        payload.extend_from_slice(&[0xde, 0xad, 0xbe]);
        assert!(matches!(
            decompress(CompressionCodec::Deflate, &payload, 1000),
            Err(CompressionError::CodecProcessFailed { .. })
        ));
    }

    #[test]
    fn levels_are_validated() {
        assert!(matches!(
            create_compressor(CompressionCodec::Deflate, Some(10)),
            Err(CompressionError::InvalidLevel { level: 10, min: 0, max: 9, .. })
        ));
        assert!(create_compressor(CompressionCodec::Deflate, Some(9)).is_ok());
        assert!(create_compressor(CompressionCodec::Zstd, Some(19)).is_ok());
        assert!(create_compressor(CompressionCodec::Zstd, Some(1000)).is_err());
        // Level-less codecs ignore the request.
        assert!(create_compressor(CompressionCodec::Lz4, Some(1000)).is_ok());
    }

    #[test]
    fn higher_deflate_level_is_not_larger() {
        let block: Vec<u8> = b"the quick brown fox jumps over the lazy dog "
            .iter()
            .cycle()
            .take(64 * 1024)
            .copied()
            .collect();
        let fast = compress(CompressionCodec::Deflate, Some(1), &block);
        let best = compress(CompressionCodec::Deflate, Some(9), &block);
        assert!(best.len() <= fast.len());
    }

    #[test]
    fn registry_resolves_ids() {
        for codec in CompressionCodec::ALL {
            let info = resolve_id(codec.id()).unwrap();
            assert_eq!(info.codec, codec);
            assert_eq!(info.name, codec.name());
        }
        assert!(matches!(resolve_id(0x7777), Err(CompressionError::UnsupportedCodec { codec_id: 0x7777 })));
        assert_eq!(resolve(CompressionCodec::Deflate).default_level, 6);
        assert_eq!(CompressionCodec::default(), CompressionCodec::Deflate);
    }
}
