use tracing::debug;

use crate::config::PipelineConfig;
use crate::constants::{DEFAULT_MEM_FRACTION, QUEUE_DEPTH_PER_WORKER};

/// Thread and queue sizing for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub worker_count: usize,
    /// Depth of the input queue between reader and workers.
    pub inflight_blocks: usize,
    /// Sequence span completed blocks may occupy ahead of the writer.
    pub reorder_window: usize,
}

impl ParallelismProfile {
    pub fn single_threaded() -> Self {
        Self {
            worker_count: 1,
            inflight_blocks: 1,
            reorder_window: QUEUE_DEPTH_PER_WORKER,
        }
    }

    pub fn for_config(config: &PipelineConfig) -> Self {
        Self::dynamic(config.worker_count, config.block_size as u64, DEFAULT_MEM_FRACTION)
    }

    /// Size queues at `worker_count * 2`, capping the input queue so it
    /// holds at most `mem_fraction` of available memory.
    pub fn dynamic(worker_count: usize, block_size: u64, mem_fraction: f64) -> Self {
        let worker_count = worker_count.max(1);
        let depth = worker_count.saturating_mul(QUEUE_DEPTH_PER_WORKER);

        let inflight_blocks = match memory_budget_blocks(block_size, mem_fraction) {
            Some(cap) => depth.min(cap).max(1),
            None => depth,
        };

        let profile = Self {
            worker_count,
            inflight_blocks,
            reorder_window: depth,
        };
        debug!(
            target: "blockpress::pipeline",
            workers = profile.worker_count,
            inflight = profile.inflight_blocks,
            window = profile.reorder_window,
            "parallelism profile"
        );
        profile
    }
}

/// Number of blocks fitting in `mem_fraction` of available memory, or `None`
/// when the platform does not report memory.
pub fn memory_budget_blocks(block_size: u64, mem_fraction: f64) -> Option<usize> {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();

    let available = sys.available_memory(); // bytes
    if available == 0 {
        return None;
    }

    let budget = (available as f64 * mem_fraction.clamp(0.0, 1.0)) as u64;
    let blocks = budget / block_size.max(1);
    Some(usize::try_from(blocks).unwrap_or(usize::MAX))
}
