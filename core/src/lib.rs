//! blockpress-core
//!
//! Parallel block compression engine. Input is split into fixed-size blocks,
//! compressed on a pool of worker threads and written back in strict
//! sequence order, so the output is identical for every worker count.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;

pub mod compression;
pub mod telemetry;

// Pipeline
pub mod stream;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::compression::CompressionCodec;
    pub use crate::config::{Mode, PipelineConfig};
    pub use crate::stream::{
        compress_stream, decompress_stream, run_stream, InputSource, OutputSink,
        PipelineController, PipelineState,
    };
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::{ErrorKind, PipelineError, Result};
}
