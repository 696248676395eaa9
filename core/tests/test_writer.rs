// StreamWriter / PlainWriter output and their error mapping.

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use bytes::Bytes;

    use blockpress_core::compression::CompressionCodec;
    use blockpress_core::constants::{END_MARKER, MAGIC};
    use blockpress_core::stream::framing::{StreamHeader, Trailer};
    use blockpress_core::stream::{
        Block, BlockSink, CompressedBlock, DurableSink, FlushError, PlainWriter, StreamWriter,
    };
    use blockpress_core::types::ErrorKind;

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    /// In-memory sink whose write or durable flush can be made to fail.
    #[derive(Default)]
    struct FaultySink {
        buf: Vec<u8>,
        fail_writes_after: Option<usize>,
        fail_durable: bool,
    }

    impl Write for FaultySink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if let Some(limit) = self.fail_writes_after {
                if self.buf.len() + data.len() > limit {
                    return Err(io::Error::new(io::ErrorKind::Other, "no space left"));
                }
            }
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl DurableSink for FaultySink {
        fn flush_durable(&mut self) -> Result<(), FlushError> {
            if self.fail_durable {
                return Err(FlushError::Io(io::Error::new(io::ErrorKind::Other, "sync failed")));
            }
            Ok(())
        }
    }

    fn header() -> StreamHeader {
        StreamHeader::new(CompressionCodec::Store, 64, 0)
    }

    fn block(sequence: u64, payload: &'static [u8]) -> CompressedBlock {
        CompressedBlock {
            sequence,
            payload: Bytes::from_static(payload),
            original_size: payload.len() as u32,
            checksum: 0x0102_0304,
        }
    }

    // ---------------------------------------------------------------------
    // StreamWriter
    // ---------------------------------------------------------------------

    #[test]
    fn frame_layout() {
        let mut writer = StreamWriter::new(Vec::new(), header());
        writer.write(&block(0, b"abc")).unwrap();
        writer.finish().unwrap();

        assert_eq!(writer.blocks_written(), 1);
        assert_eq!(writer.uncompressed_bytes(), 3);

        let out = writer.into_inner();
        assert_eq!(&out[0..4], &MAGIC);

        let frame = &out[StreamHeader::LEN..];
        assert_eq!(&frame[0..4], &3u32.to_le_bytes());
        assert_eq!(&frame[4..8], &0x0102_0304u32.to_le_bytes());
        assert_eq!(&frame[8..11], b"abc");

        let tail = &frame[11..];
        assert_eq!(tail.len(), Trailer::WIRE_LEN);
        assert_eq!(&tail[0..4], &END_MARKER.to_le_bytes());
        assert_eq!(&tail[4..12], &1u64.to_le_bytes());
        assert_eq!(&tail[12..20], &3u64.to_le_bytes());
    }

    #[test]
    fn counters_cover_every_byte() {
        let mut writer = StreamWriter::new(Vec::new(), header());
        writer.write_block(block(0, b"hello")).unwrap();
        writer.write_block(block(1, b"world!")).unwrap();
        writer.finish().unwrap();

        let counters = writer.counters().clone();
        assert_eq!(counters.blocks, 2);
        assert_eq!(counters.bytes_uncompressed, 11);
        assert_eq!(counters.bytes_compressed, 11);
        assert_eq!(counters.stream_bytes(), writer.get_ref().len() as u64);
    }

    #[test]
    fn out_of_order_frame_is_refused() {
        let mut writer = StreamWriter::new(Vec::new(), header());
        let err = writer.write(&block(1, b"x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.sequence(), Some(1));
    }

    #[test]
    fn finish_is_idempotent_and_final() {
        let mut writer = StreamWriter::new(Vec::new(), header());
        writer.finish().unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.get_ref().len(), StreamHeader::LEN + Trailer::WIRE_LEN);
        assert!(writer.write(&block(0, b"late")).is_err());
    }

    #[test]
    fn write_failure_is_a_write_error() {
        let sink = FaultySink { fail_writes_after: Some(StreamHeader::LEN + 10), ..Default::default() };
        let mut writer = StreamWriter::new(sink, header());
        writer.write(&block(0, b"a")).unwrap();

        let err = writer.write(&block(1, b"bbbbbbbb")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Write);
        assert_eq!(err.sequence(), Some(1));
    }

    #[test]
    fn failed_durable_flush_is_a_flush_error() {
        let sink = FaultySink { fail_durable: true, ..Default::default() };
        let mut writer = StreamWriter::new(sink, header());
        writer.write(&block(0, b"abc")).unwrap();

        let err = writer.finish().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Flush);
        assert!(err.cause_as::<FlushError>().is_some());
        // Every byte reached the sink before the flush failed.
        assert_eq!(writer.get_ref().buf.len(), StreamHeader::LEN + 8 + 3 + Trailer::WIRE_LEN);
    }

    // ---------------------------------------------------------------------
    // PlainWriter
    // ---------------------------------------------------------------------

    #[test]
    fn plain_writer_concatenates_blocks() {
        let mut writer = PlainWriter::new(Vec::new());
        writer.write_block(Block::new(0, Bytes::from_static(b"foo"))).unwrap();
        writer.write_block(Block::new(1, Bytes::from_static(b"bar"))).unwrap();
        writer.finish().unwrap();

        assert_eq!(writer.blocks_written(), 2);
        assert_eq!(writer.uncompressed_bytes(), 6);
        assert_eq!(writer.into_inner(), b"foobar");
    }

    #[test]
    fn plain_writer_flush_failure() {
        let sink = FaultySink { fail_durable: true, ..Default::default() };
        let mut writer = PlainWriter::new(sink);
        writer.write_block(Block::new(0, Bytes::from_static(b"foo"))).unwrap();
        assert_eq!(writer.finish().unwrap_err().kind(), ErrorKind::Flush);
    }
}
