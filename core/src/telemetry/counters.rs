//! Mutable byte and frame counters, folded into a snapshot at the end of a run.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub blocks: u64,
    pub bytes_uncompressed: u64,
    pub bytes_compressed: u64,
    /// Stream header, frame headers, end marker and trailer.
    pub bytes_overhead: u64,
}

impl TelemetryCounters {
    pub fn add_header(&mut self, header_len: usize) {
        self.bytes_overhead += header_len as u64;
    }

    /// Record one block.
    ///
    /// - `uncompressed_len`: original block length
    /// - `compressed_len`: codec payload length
    /// - `frame_overhead_len`: frame header bytes around the payload
    pub fn add_block(&mut self, uncompressed_len: usize, compressed_len: usize, frame_overhead_len: usize) {
        self.blocks += 1;
        self.bytes_uncompressed += uncompressed_len as u64;
        self.bytes_compressed += compressed_len as u64;
        self.bytes_overhead += frame_overhead_len as u64;
    }

    /// Record end marker plus trailer.
    pub fn add_trailer(&mut self, trailer_len: usize) {
        self.bytes_overhead += trailer_len as u64;
    }

    /// Every byte of the compressed stream, framing included.
    pub fn stream_bytes(&self) -> u64 {
        self.bytes_compressed + self.bytes_overhead
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.blocks             += other.blocks;
        self.bytes_uncompressed += other.bytes_uncompressed;
        self.bytes_compressed   += other.bytes_compressed;
        self.bytes_overhead     += other.bytes_overhead;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
