//! Units of work flowing through the pipeline.

use std::time::Duration;

use bytes::Bytes;

/// Anything carrying its position in the stream.
pub trait Sequenced {
    fn sequence(&self) -> u64;
}

/// Uncompressed block: read from input when compressing, produced by a
/// worker when decompressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub sequence: u64,
    pub data: Bytes,
    pub size: u32,
}

impl Block {
    /// `data` must not exceed `MAX_BLOCK_SIZE`.
    pub fn new(sequence: u64, data: Bytes) -> Self {
        let size = data.len() as u32;
        Self { sequence, data, size }
    }
}

/// Codec output for one block plus what the frame header needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    pub sequence: u64,
    pub payload: Bytes,
    pub original_size: u32,
    /// CRC32 of the uncompressed content.
    pub checksum: u32,
}

/// Frame read back from a compressed stream, awaiting decompression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u64,
    pub payload: Bytes,
    pub checksum: u32,
}

/// Worker result with the time spent producing it.
#[derive(Debug)]
pub struct Completed<T> {
    pub item: T,
    pub worker_id: usize,
    pub elapsed: Duration,
}

impl Sequenced for Block {
    fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Sequenced for CompressedBlock {
    fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Sequenced for Frame {
    fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl<T: Sequenced> Sequenced for Completed<T> {
    fn sequence(&self) -> u64 {
        self.item.sequence()
    }
}
