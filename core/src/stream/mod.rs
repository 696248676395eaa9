//! Parallel block pipeline.
//!
//! A [`BlockReader`] (or [`FrameReader`] when decompressing) feeds sequenced
//! items to a [`CodecWorkerPool`]; results pass through the reorder window to
//! the [`Sequencer`], which hands them in order to a [`BlockSink`]. The
//! [`PipelineController`] owns the threads, queues and cancellation of a run.

pub mod block;
pub mod cancel;
pub mod queue;
pub mod framing;
pub mod reader;
pub mod sequencer;
pub mod durable;
pub mod writer;
pub mod worker;
pub mod parallelism;
pub mod pipeline;
pub mod io;
pub mod core;

pub use block::{Block, Completed, CompressedBlock, Frame, Sequenced};
pub use cancel::{CancellationSource, CancellationToken};
pub use durable::{classify_flush_error, DurableSink, DurableWrite, FlushError};
pub use io::{InputSource, OutputSink};
pub use parallelism::ParallelismProfile;
pub use pipeline::{PipelineController, PipelineState, StateHandle};
pub use reader::{BlockReader, BlockSource, FrameReader};
pub use sequencer::{ReorderWindow, Sequencer, SequencerError};
pub use worker::{BackendFactory, CodecSpec, CodecWorkerPool, CompressionBackend, RegistryBackendFactory};
pub use writer::{BlockSink, PlainWriter, StreamWriter};

pub use self::core::{compress_stream, decompress_stream, run_stream};
