//! Per-block compression and decompression.
//!
//! Every codec here is stateless across blocks: a block is encoded with no
//! history from its predecessors, so blocks can be processed on any worker in
//! any order and the output stays byte-identical for every worker count.
//!
//! The registry resolves a [`CompressionCodec`] to its metadata and builds
//! boxed [`Compressor`] / [`Decompressor`] instances.

pub mod constants;
pub mod types;
pub mod registry;
pub mod codecs;

pub use constants::*;
pub use types::*;
pub use registry::*;
