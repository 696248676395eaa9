//! Pipeline configuration and its validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compression::{resolve, CompressionCodec};
use crate::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_GRACE_PERIOD, MAX_BLOCK_SIZE, MAX_WORKERS, MIN_BLOCK_SIZE,
};
use crate::types::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Compress,
    Decompress,
}

/// Run configuration.
///
/// When decompressing, `codec`, `level` and `block_size` are taken from the
/// stream header; only `worker_count` and `grace_period` apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: Mode,
    pub block_size: usize,
    pub worker_count: usize,
    pub codec: CompressionCodec,
    /// `None` selects the codec default.
    pub level: Option<i32>,
    /// How long the controller waits for threads after a failure.
    pub grace_period: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Compress,
            block_size: DEFAULT_BLOCK_SIZE,
            worker_count: num_cpus::get().clamp(1, MAX_WORKERS),
            codec: CompressionCodec::default(),
            level: None,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl PipelineConfig {
    pub fn new(mode: Mode) -> Self {
        Self { mode, ..Self::default() }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(PipelineError::config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_block_size(self.block_size)?;
        validate_worker_count(self.worker_count)?;
        if self.mode == Mode::Compress {
            self.effective_level()?;
        }
        Ok(())
    }

    /// Codec level used for compression (default applied, range checked).
    pub fn effective_level(&self) -> Result<i32> {
        resolve(self.codec)
            .effective_level(self.level)
            .map_err(PipelineError::config)
    }
}

pub fn validate_block_size(block_size: usize) -> Result<()> {
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
        return Err(PipelineError::config(format!(
            "block size {block_size} outside {MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}"
        )));
    }
    Ok(())
}

pub fn validate_worker_count(worker_count: usize) -> Result<()> {
    if !(1..=MAX_WORKERS).contains(&worker_count) {
        return Err(PipelineError::config(format!(
            "worker count {worker_count} outside 1..={MAX_WORKERS}"
        )));
    }
    Ok(())
}
