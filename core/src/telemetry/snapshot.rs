use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compression::CompressionCodec;
use crate::config::Mode;
use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

/// Immutable summary of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub mode: Mode,
    pub codec: CompressionCodec,
    pub level: i32,
    pub block_size: usize,
    pub worker_count: usize,
    pub blocks: u64,
    pub bytes_uncompressed: u64,
    pub bytes_compressed: u64,
    pub bytes_overhead: u64,
    /// Compressed stream bytes (framing included) over uncompressed bytes.
    pub compression_ratio: f64,
    pub throughput_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
    /// Sink contents when the run wrote to memory.
    #[serde(skip)]
    pub output: Option<Vec<u8>>,
}

/// Run parameters recorded next to the counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunInfo {
    pub mode: Mode,
    pub codec: CompressionCodec,
    pub level: i32,
    pub block_size: usize,
    pub worker_count: usize,
}

impl TelemetrySnapshot {
    pub fn from(info: RunInfo, counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();

        let compression_ratio = if counters.bytes_uncompressed > 0 {
            counters.stream_bytes() as f64 / counters.bytes_uncompressed as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_uncompressed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            mode: info.mode,
            codec: info.codec,
            level: info.level,
            block_size: info.block_size,
            worker_count: info.worker_count,
            blocks: counters.blocks,
            bytes_uncompressed: counters.bytes_uncompressed,
            bytes_compressed: counters.bytes_compressed,
            bytes_overhead: counters.bytes_overhead,
            compression_ratio,
            throughput_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
            output: None,
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    pub fn has_all_stages(&self, expected: &[Stage]) -> bool {
        self.stage_times.has_all(expected)
    }

    /// Size of the compressed stream, framing included.
    pub fn stream_bytes(&self) -> u64 {
        self.bytes_compressed + self.bytes_overhead
    }

    pub fn attach_output(&mut self, buf: Vec<u8>) {
        self.output = Some(buf);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
