//! Output side of the pipeline. Sinks receive items already in sequence order.

use std::io::Write;
use std::time::Instant;

use tracing::debug;

use crate::constants::END_MARKER;
use crate::stream::block::{Block, CompressedBlock};
use crate::stream::durable::DurableSink;
use crate::stream::framing::{
    encode_frame_header, encode_stream_header, encode_trailer, FrameHeader, StreamHeader, Trailer,
};
use crate::telemetry::{Stage, StageTimes, TelemetryCounters};
use crate::types::{PipelineError, Result};

/// Ordered consumer of pipeline output.
pub trait BlockSink<T> {
    fn write_block(&mut self, item: T) -> Result<()>;

    /// Complete the output and make it durable.
    fn finish(&mut self) -> Result<()>;

    fn blocks_written(&self) -> u64;

    /// Uncompressed bytes represented by everything written so far.
    fn uncompressed_bytes(&self) -> u64;

    fn counters(&self) -> &TelemetryCounters;

    fn stage_times(&self) -> &StageTimes;
}

/// Serializes [`CompressedBlock`]s into the framed stream format.
///
/// The stream header goes out with the first frame (or with the trailer for
/// an empty input). `finish` writes the end marker and trailer, flushes, and
/// performs a durable flush; a failed durable flush is not retried.
pub struct StreamWriter<W: Write + DurableSink> {
    inner: W,
    header: StreamHeader,
    header_written: bool,
    finished: bool,
    block_count: u64,
    total_uncompressed: u64,
    counters: TelemetryCounters,
    times: StageTimes,
}

impl<W: Write + DurableSink> StreamWriter<W> {
    pub fn new(inner: W, header: StreamHeader) -> Self {
        Self {
            inner,
            header,
            header_written: false,
            finished: false,
            block_count: 0,
            total_uncompressed: 0,
            counters: TelemetryCounters::default(),
            times: StageTimes::default(),
        }
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn ensure_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        let buf = encode_stream_header(&self.header);
        self.inner
            .write_all(&buf)
            .map_err(|e| PipelineError::write(None, e))?;
        self.counters.add_header(buf.len());
        self.header_written = true;
        Ok(())
    }

    pub fn write(&mut self, block: &CompressedBlock) -> Result<()> {
        let start = Instant::now();
        let sequence = block.sequence;
        if self.finished {
            return Err(PipelineError::internal(Some(sequence), "write after finish"));
        }
        if sequence != self.block_count {
            return Err(PipelineError::internal(
                Some(sequence),
                format!("out of order frame, expected block {}", self.block_count),
            ));
        }
        let payload_len = u32::try_from(block.payload.len())
            .ok()
            .filter(|len| *len != END_MARKER && *len != 0)
            .ok_or_else(|| {
                PipelineError::write(Some(sequence), format!("unframeable payload of {} bytes", block.payload.len()))
            })?;

        self.ensure_header()?;
        let frame = encode_frame_header(&FrameHeader { payload_len, checksum: block.checksum });
        self.inner
            .write_all(&frame)
            .and_then(|_| self.inner.write_all(&block.payload))
            .map_err(|e| PipelineError::write(Some(sequence), e))?;

        self.block_count += 1;
        self.total_uncompressed += block.original_size as u64;
        self.counters.add_block(block.original_size as usize, block.payload.len(), frame.len());
        self.times.add(Stage::Write, start.elapsed());
        Ok(())
    }
}

impl<W: Write + DurableSink> BlockSink<CompressedBlock> for StreamWriter<W> {
    fn write_block(&mut self, item: CompressedBlock) -> Result<()> {
        self.write(&item)
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let start = Instant::now();
        self.ensure_header()?;
        let trailer = Trailer {
            block_count: self.block_count,
            total_uncompressed: self.total_uncompressed,
        };
        let buf = encode_trailer(&trailer);
        self.inner
            .write_all(&buf)
            .and_then(|_| self.inner.flush())
            .map_err(|e| PipelineError::write(None, e))?;
        self.counters.add_trailer(buf.len());
        self.times.add(Stage::Write, start.elapsed());

        let start = Instant::now();
        self.inner.flush_durable().map_err(PipelineError::flush)?;
        self.times.add(Stage::Flush, start.elapsed());

        self.finished = true;
        debug!(
            target: "blockpress::writer",
            blocks = trailer.block_count,
            total = trailer.total_uncompressed,
            "stream finished"
        );
        Ok(())
    }

    fn blocks_written(&self) -> u64 {
        self.block_count
    }

    fn uncompressed_bytes(&self) -> u64 {
        self.total_uncompressed
    }

    fn counters(&self) -> &TelemetryCounters {
        &self.counters
    }

    fn stage_times(&self) -> &StageTimes {
        &self.times
    }
}

/// Writes decompressed [`Block`]s back to back.
pub struct PlainWriter<W: Write + DurableSink> {
    inner: W,
    finished: bool,
    counters: TelemetryCounters,
    times: StageTimes,
}

impl<W: Write + DurableSink> PlainWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            finished: false,
            counters: TelemetryCounters::default(),
            times: StageTimes::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + DurableSink> BlockSink<Block> for PlainWriter<W> {
    fn write_block(&mut self, item: Block) -> Result<()> {
        let start = Instant::now();
        if item.sequence != self.counters.blocks {
            return Err(PipelineError::internal(
                Some(item.sequence),
                format!("out of order block, expected {}", self.counters.blocks),
            ));
        }
        self.inner
            .write_all(&item.data)
            .map_err(|e| PipelineError::write(Some(item.sequence), e))?;
        self.counters.blocks += 1;
        self.counters.bytes_uncompressed += item.data.len() as u64;
        self.times.add(Stage::Write, start.elapsed());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let start = Instant::now();
        self.inner.flush().map_err(|e| PipelineError::write(None, e))?;
        self.inner.flush_durable().map_err(PipelineError::flush)?;
        self.times.add(Stage::Flush, start.elapsed());
        self.finished = true;
        debug!(target: "blockpress::writer", blocks = self.counters.blocks, "output finished");
        Ok(())
    }

    fn blocks_written(&self) -> u64 {
        self.counters.blocks
    }

    fn uncompressed_bytes(&self) -> u64 {
        self.counters.bytes_uncompressed
    }

    fn counters(&self) -> &TelemetryCounters {
        &self.counters
    }

    fn stage_times(&self) -> &StageTimes {
        &self.times
    }
}
