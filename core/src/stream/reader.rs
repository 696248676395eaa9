//! Input side of the pipeline: turns a byte stream into sequenced work items.

use std::io::{self, Read};

use bytes::Bytes;
use tracing::{debug, trace};

use crate::stream::block::{Block, Frame, Sequenced};
use crate::stream::framing::{
    decode_record_tag, decode_stream_header, decode_trailer, max_payload_len, FrameHeader,
    FramingError, RecordTag, StreamHeader, Trailer,
};
use crate::telemetry::TelemetryCounters;
use crate::types::{ErrorKind, PipelineError, Result};

/// Producer of sequenced items, driven by the pipeline's reader thread.
pub trait BlockSource: Send + 'static {
    type Item: Sequenced + Send + 'static;

    /// Next item, or `None` at end of stream.
    fn next_item(&mut self) -> Result<Option<Self::Item>>;

    /// Check the consumer's totals against what the source announced.
    fn verify_totals(&self, _blocks: u64, _uncompressed: u64) -> Result<()> {
        Ok(())
    }

    /// Contribute source-side byte counts to the run's telemetry.
    fn record(&self, _counters: &mut TelemetryCounters) {}
}

/// Splits a reader into fixed-size [`Block`]s numbered from 0.
///
/// Every block except the last holds exactly `block_size` bytes; an empty
/// input yields no blocks at all.
pub struct BlockReader<R> {
    inner: R,
    block_size: usize,
    next_sequence: u64,
    bytes_read: u64,
    done: bool,
}

impl<R: Read> BlockReader<R> {
    pub fn new(inner: R, block_size: usize) -> Self {
        Self {
            inner,
            block_size: block_size.max(1),
            next_sequence: 0,
            bytes_read: 0,
            done: false,
        }
    }

    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.done {
            return Ok(None);
        }

        let sequence = self.next_sequence;
        let mut buf = vec![0u8; self.block_size];
        let mut filled = 0;
        while filled < self.block_size {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Err(PipelineError::read(sequence, e));
                }
            }
        }

        // A short block can only come from end of input.
        if filled < self.block_size {
            self.done = true;
        }
        if filled == 0 {
            debug!(target: "blockpress::reader", blocks = sequence, bytes = self.bytes_read, "end of input");
            return Ok(None);
        }

        buf.truncate(filled);
        self.next_sequence += 1;
        self.bytes_read += filled as u64;
        trace!(target: "blockpress::reader", sequence, len = filled, "block read");
        Ok(Some(Block::new(sequence, Bytes::from(buf))))
    }

    pub fn blocks_read(&self) -> u64 {
        self.next_sequence
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Iterator for BlockReader<R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

impl<R: Read + Send + 'static> BlockSource for BlockReader<R> {
    type Item = Block;

    fn next_item(&mut self) -> Result<Option<Block>> {
        self.next_block()
    }
}

/// Parses a compressed stream back into [`Frame`]s.
///
/// The stream header is consumed by [`FrameReader::open`]. Frames are numbered
/// from 0 in stream order; the trailer is validated against the frames read.
pub struct FrameReader<R> {
    inner: R,
    header: StreamHeader,
    max_payload: usize,
    next_sequence: u64,
    payload_bytes: u64,
    trailer: Option<Trailer>,
}

impl<R: Read> FrameReader<R> {
    pub fn open(mut inner: R) -> Result<Self> {
        let mut buf = [0u8; StreamHeader::LEN];
        read_fully(&mut inner, &mut buf, None, "stream header")?;
        let header = decode_stream_header(&buf).map_err(|e| PipelineError::format(None, e))?;
        debug!(
            target: "blockpress::reader",
            codec = %header.codec,
            block_size = header.block_size,
            level = header.level,
            "stream header read"
        );
        Ok(Self {
            inner,
            max_payload: max_payload_len(header.block_size as usize),
            header,
            next_sequence: 0,
            payload_bytes: 0,
            trailer: None,
        })
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    /// Trailer, once the end marker has been reached.
    pub fn trailer(&self) -> Option<&Trailer> {
        self.trailer.as_ref()
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.trailer.is_some() {
            return Ok(None);
        }

        let sequence = self.next_sequence;
        let mut word = [0u8; 4];
        read_fully(&mut self.inner, &mut word, Some(sequence), "frame header")?;

        match decode_record_tag(word, self.max_payload).map_err(|e| PipelineError::format(Some(sequence), e))? {
            RecordTag::End => {
                self.finish_stream()?;
                Ok(None)
            }
            RecordTag::Frame { payload_len } => {
                let mut checksum = [0u8; 4];
                read_fully(&mut self.inner, &mut checksum, Some(sequence), "frame header")?;
                let header = FrameHeader { payload_len, checksum: u32::from_le_bytes(checksum) };

                let mut payload = vec![0u8; header.payload_len as usize];
                read_fully(&mut self.inner, &mut payload, Some(sequence), "frame payload")?;

                self.next_sequence += 1;
                self.payload_bytes += payload.len() as u64;
                trace!(target: "blockpress::reader", sequence, len = payload.len(), "frame read");
                Ok(Some(Frame { sequence, payload: Bytes::from(payload), checksum: header.checksum }))
            }
        }
    }

    fn finish_stream(&mut self) -> Result<()> {
        let mut buf = [0u8; Trailer::LEN];
        read_fully(&mut self.inner, &mut buf, None, "trailer")?;
        let trailer = decode_trailer(&buf).map_err(|e| PipelineError::format(None, e))?;

        if trailer.block_count != self.next_sequence {
            return Err(PipelineError::format(None, FramingError::BlockCountMismatch {
                expected: trailer.block_count,
                actual: self.next_sequence,
            }));
        }

        let mut probe = [0u8; 1];
        loop {
            match self.inner.read(&mut probe) {
                Ok(0) => break,
                Ok(_) => return Err(PipelineError::format(None, FramingError::TrailingData)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PipelineError::read(self.next_sequence, e)),
            }
        }

        debug!(
            target: "blockpress::reader",
            blocks = trailer.block_count,
            total = trailer.total_uncompressed,
            "trailer read"
        );
        self.trailer = Some(trailer);
        Ok(())
    }
}

/// `read_exact` that reports a short stream as a format error.
fn read_fully<R: Read>(
    inner: &mut R,
    buf: &mut [u8],
    sequence: Option<u64>,
    what: &'static str,
) -> Result<()> {
    inner.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => PipelineError::format(sequence, FramingError::Truncated(what)),
        _ => PipelineError::new(ErrorKind::Read, sequence, e),
    })
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl<R: Read + Send + 'static> BlockSource for FrameReader<R> {
    type Item = Frame;

    fn next_item(&mut self) -> Result<Option<Frame>> {
        self.next_frame()
    }

    fn verify_totals(&self, blocks: u64, uncompressed: u64) -> Result<()> {
        let trailer = self
            .trailer
            .ok_or_else(|| PipelineError::format(None, FramingError::Truncated("trailer")))?;
        if trailer.block_count != blocks {
            return Err(PipelineError::format(None, FramingError::BlockCountMismatch {
                expected: trailer.block_count,
                actual: blocks,
            }));
        }
        if trailer.total_uncompressed != uncompressed {
            return Err(PipelineError::format(None, FramingError::SizeMismatch {
                expected: trailer.total_uncompressed,
                actual: uncompressed,
            }));
        }
        Ok(())
    }

    fn record(&self, counters: &mut TelemetryCounters) {
        counters.bytes_compressed = self.payload_bytes;
        counters.bytes_overhead = StreamHeader::LEN as u64
            + self.next_sequence * FrameHeader::LEN as u64
            + if self.trailer.is_some() { Trailer::WIRE_LEN as u64 } else { 0 };
    }
}
