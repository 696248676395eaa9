//! Stream-wide constants: wire identifiers, size bounds and timings.

use std::time::Duration;

/// Leading bytes of every compressed stream.
pub const MAGIC: [u8; 4] = *b"BPZ1";
pub const FORMAT_VERSION: u16 = 1;

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * KIB;

/// Default block size (128 KiB, the classic parallel-gzip unit).
pub const DEFAULT_BLOCK_SIZE: usize = 128 * KIB;
pub const MIN_BLOCK_SIZE: usize = 1;
/// Blocks are capped so sizes always fit a `u32` and never collide with [`END_MARKER`].
pub const MAX_BLOCK_SIZE: usize = 32 * MIB;

pub const MAX_WORKERS: usize = 1024;

/// Queue slots reserved per worker, for both the input queue and the reorder window.
pub const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Length word that terminates the frame sequence and announces the trailer.
pub const END_MARKER: u32 = u32::MAX;

/// Wait slice for every blocking queue operation; bounds cancellation latency.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Share of available memory the input queue may occupy.
pub const DEFAULT_MEM_FRACTION: f64 = 0.25;
