// BlockReader splitting and FrameReader parsing, including the failure paths:
// short reads, interrupted reads, read errors, truncated or inconsistent streams.

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use bytes::Bytes;

    use blockpress_core::compression::CompressionCodec;
    use blockpress_core::constants::DEFAULT_BLOCK_SIZE;
    use blockpress_core::stream::framing::{FramingError, StreamHeader, Trailer};
    use blockpress_core::stream::{
        BlockReader, BlockSink, BlockSource, CompressedBlock, FrameReader, StreamWriter,
    };
    use blockpress_core::types::ErrorKind;
    use blockpress_core::utils::compute_checksum;

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    /// Hands out at most `chunk` bytes per call and interrupts every other call.
    struct ChoppyReader {
        inner: Cursor<Vec<u8>>,
        chunk: usize,
        calls: usize,
    }

    impl Read for ChoppyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = buf.len().min(self.chunk);
            self.inner.read(&mut buf[..n])
        }
    }

    /// Serves `good` bytes, then fails.
    struct FailingReader {
        good: usize,
        served: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served >= self.good {
                return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
            }
            let n = buf.len().min(self.good - self.served);
            buf[..n].fill(0x5A);
            self.served += n;
            Ok(n)
        }
    }

    /// Build a store-codec stream of the given blocks.
    fn stored_stream(blocks: &[&str], block_size: u32) -> Vec<u8> {
        let header = StreamHeader::new(CompressionCodec::Store, block_size, 0);
        let mut writer = StreamWriter::new(Vec::new(), header);
        for (i, text) in blocks.iter().enumerate() {
            let data = text.as_bytes();
            writer
                .write(&CompressedBlock {
                    sequence: i as u64,
                    payload: Bytes::copy_from_slice(data),
                    original_size: data.len() as u32,
                    checksum: compute_checksum(data),
                })
                .unwrap();
        }
        writer.finish().unwrap();
        writer.into_inner()
    }

    // ---------------------------------------------------------------------
    // BlockReader
    // ---------------------------------------------------------------------

    #[test]
    fn splits_into_full_blocks_and_a_short_tail() {
        let input = vec![0x41u8; 300_000];
        let blocks: Vec<_> = BlockReader::new(Cursor::new(input), DEFAULT_BLOCK_SIZE)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].size as usize, DEFAULT_BLOCK_SIZE);
        assert_eq!(blocks[1].size as usize, DEFAULT_BLOCK_SIZE);
        assert_eq!(blocks[2].size as usize, 300_000 - 2 * DEFAULT_BLOCK_SIZE);
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.sequence, i as u64);
            assert_eq!(block.data.len(), block.size as usize);
        }
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let mut reader = BlockReader::new(Cursor::new(vec![1u8; 4096]), 1024);
        let mut count = 0;
        while let Some(block) = reader.next_block().unwrap() {
            assert_eq!(block.size, 1024);
            count += 1;
        }
        assert_eq!(count, 4);
        assert_eq!(reader.blocks_read(), 4);
        assert_eq!(reader.bytes_read(), 4096);
        assert!(reader.next_block().unwrap().is_none());
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        let mut reader = BlockReader::new(io::empty(), DEFAULT_BLOCK_SIZE);
        assert!(reader.next_block().unwrap().is_none());
        assert_eq!(reader.blocks_read(), 0);
    }

    #[test]
    fn short_reads_are_accumulated_into_full_blocks() {
        let data: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let choppy = ChoppyReader { inner: Cursor::new(data.clone()), chunk: 333, calls: 0 };

        let blocks: Vec<_> = BlockReader::new(choppy, 4096).collect::<Result<_, _>>().unwrap();
        assert_eq!(blocks.iter().map(|b| b.size).collect::<Vec<_>>(), vec![4096, 4096, 1808]);

        let joined: Vec<u8> = blocks.iter().flat_map(|b| b.data.iter().copied()).collect();
        assert_eq!(joined, data);
    }

    #[test]
    fn read_error_reports_the_failing_sequence() {
        let mut reader = BlockReader::new(FailingReader { good: 2500, served: 0 }, 1000);
        assert_eq!(reader.next_block().unwrap().unwrap().sequence, 0);
        assert_eq!(reader.next_block().unwrap().unwrap().sequence, 1);

        let err = reader.next_block().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
        assert_eq!(err.sequence(), Some(2));
        assert!(err.cause_as::<io::Error>().is_some());

        // The reader does not resume after a failure.
        assert!(reader.next_block().unwrap().is_none());
    }

    // ---------------------------------------------------------------------
    // FrameReader
    // ---------------------------------------------------------------------

    #[test]
    fn frames_are_read_in_order() {
        let stream = stored_stream(&["hello", "world", "!"], 16);
        let mut reader = FrameReader::open(Cursor::new(stream)).unwrap();
        assert_eq!(reader.header().codec, CompressionCodec::Store);
        assert_eq!(reader.header().block_size, 16);

        let frames: Vec<_> = reader.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[1].payload[..], b"world");
        assert_eq!(frames[2].sequence, 2);
        assert_eq!(frames[0].checksum, compute_checksum(b"hello"));

        let trailer = *reader.trailer().unwrap();
        assert_eq!(trailer, Trailer { block_count: 3, total_uncompressed: 11 });
        assert!(reader.verify_totals(3, 11).is_ok());
        assert!(reader.verify_totals(3, 12).is_err());
    }

    #[test]
    fn empty_stream_has_only_header_and_trailer() {
        let stream = stored_stream(&[], 16);
        assert_eq!(stream.len(), StreamHeader::LEN + Trailer::WIRE_LEN);

        let mut reader = FrameReader::open(Cursor::new(stream)).unwrap();
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.trailer().unwrap().block_count, 0);
    }

    #[test]
    fn truncated_payload_is_a_format_error() {
        let stream = stored_stream(&["hello", "world"], 16);
        let cut = StreamHeader::LEN + 8 + 5 + 8 + 2;
        let mut reader = FrameReader::open(Cursor::new(stream[..cut].to_vec())).unwrap();

        assert!(reader.next_frame().unwrap().is_some());
        let err = reader.next_frame().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.sequence(), Some(1));
        assert_eq!(err.cause_as::<FramingError>(), Some(&FramingError::Truncated("frame payload")));
    }

    #[test]
    fn missing_trailer_is_a_format_error() {
        let stream = stored_stream(&["abc"], 16);
        let cut = stream.len() - Trailer::WIRE_LEN;
        let mut reader = FrameReader::open(Cursor::new(stream[..cut].to_vec())).unwrap();

        assert!(reader.next_frame().unwrap().is_some());
        let err = reader.next_frame().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn trailer_count_mismatch_is_detected() {
        let mut stream = stored_stream(&["abc", "def"], 16);
        let count_at = stream.len() - Trailer::LEN;
        stream[count_at..count_at + 8].copy_from_slice(&5u64.to_le_bytes());

        let mut reader = FrameReader::open(Cursor::new(stream)).unwrap();
        let err = reader.by_ref().collect::<Result<Vec<_>, _>>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(
            err.cause_as::<FramingError>(),
            Some(&FramingError::BlockCountMismatch { expected: 5, actual: 2 })
        );
    }

    #[test]
    fn data_after_trailer_is_rejected() {
        let mut stream = stored_stream(&["abc"], 16);
        stream.push(0);

        let mut reader = FrameReader::open(Cursor::new(stream)).unwrap();
        assert!(reader.next_frame().unwrap().is_some());
        let err = reader.next_frame().unwrap_err();
        assert_eq!(err.cause_as::<FramingError>(), Some(&FramingError::TrailingData));
    }

    #[test]
    fn oversized_frame_length_is_rejected() {
        let mut stream = stored_stream(&["abc"], 16);
        stream[StreamHeader::LEN..StreamHeader::LEN + 4].copy_from_slice(&100_000u32.to_le_bytes());

        let mut reader = FrameReader::open(Cursor::new(stream)).unwrap();
        let err = reader.next_frame().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(
            err.cause_as::<FramingError>(),
            Some(FramingError::FrameTooLarge { len: 100_000, .. })
        ));
    }

    #[test]
    fn garbage_is_not_a_stream() {
        let err = FrameReader::open(Cursor::new(vec![0u8; 64])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Format);

        let err = FrameReader::open(Cursor::new(vec![0u8; 3])).err().unwrap();
        assert_eq!(err.cause_as::<FramingError>(), Some(&FramingError::Truncated("stream header")));
    }
}
