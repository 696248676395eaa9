//! Codec worker pool.
//!
//! Each worker owns one [`CompressionBackend`] and loops: take an item from
//! the input queue, run the codec, push the result to the completion queue
//! tagged with the original sequence number. The first failure (codec error,
//! checksum mismatch or panic) is reported and the worker stops taking work.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use bytes::Bytes;
use crossbeam::channel::Receiver;
use tracing::{debug, trace, warn};

use crate::compression::{
    create_compressor, create_decompressor, CompressionCodec, CompressionError, Compressor,
    Decompressor,
};
use crate::stream::block::{Block, Completed, CompressedBlock, Frame, Sequenced};
use crate::stream::cancel::CancellationToken;
use crate::stream::queue::recv_with_cancel;
use crate::stream::sequencer::CompletionQueue;
use crate::telemetry::Stage;
use crate::types::{PipelineError, Result};
use crate::utils::{compute_checksum, verify_checksum};

/// Block-level codec operations used by a worker.
pub trait CompressionBackend: Send {
    fn compress_block(&mut self, block: &Block) -> std::result::Result<Bytes, CompressionError>;

    fn decompress_block(&mut self, frame: &Frame, max_len: usize) -> std::result::Result<Bytes, CompressionError>;
}

/// Codec and level a backend must implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSpec {
    pub codec: CompressionCodec,
    pub level: i32,
}

/// Builds one backend per worker.
pub trait BackendFactory: Send + Sync {
    fn make_backend(&self, worker_id: usize, spec: CodecSpec)
        -> std::result::Result<Box<dyn CompressionBackend>, CompressionError>;
}

/// Default factory backed by the codec registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryBackendFactory;

impl BackendFactory for RegistryBackendFactory {
    fn make_backend(&self, _worker_id: usize, spec: CodecSpec)
        -> std::result::Result<Box<dyn CompressionBackend>, CompressionError>
    {
        Ok(Box::new(CodecBackend::new(spec)?))
    }
}

pub struct CodecBackend {
    compressor: Box<dyn Compressor>,
    decompressor: Box<dyn Decompressor>,
}

impl CodecBackend {
    pub fn new(spec: CodecSpec) -> std::result::Result<Self, CompressionError> {
        Ok(Self {
            compressor: create_compressor(spec.codec, Some(spec.level))?,
            decompressor: create_decompressor(spec.codec)?,
        })
    }
}

impl CompressionBackend for CodecBackend {
    fn compress_block(&mut self, block: &Block) -> std::result::Result<Bytes, CompressionError> {
        let mut out = Vec::with_capacity(block.data.len() / 2 + 64);
        self.compressor.compress_block(&block.data, &mut out)?;
        Ok(Bytes::from(out))
    }

    fn decompress_block(&mut self, frame: &Frame, max_len: usize) -> std::result::Result<Bytes, CompressionError> {
        let mut out = Vec::with_capacity(max_len);
        self.decompressor.decompress_block(&frame.payload, max_len, &mut out)?;
        Ok(Bytes::from(out))
    }
}

/// What a worker does to one item.
pub trait WorkerTask: Send + Sync + 'static {
    type Input: Sequenced + Send + 'static;
    type Output: Sequenced + Send + 'static;

    const STAGE: Stage;

    fn process(&self, backend: &mut dyn CompressionBackend, input: Self::Input) -> Result<Self::Output>;
}

/// Block -> CompressedBlock, checksumming the uncompressed content.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompressTask;

impl WorkerTask for CompressTask {
    type Input = Block;
    type Output = CompressedBlock;

    const STAGE: Stage = Stage::Compress;

    fn process(&self, backend: &mut dyn CompressionBackend, block: Block) -> Result<CompressedBlock> {
        let payload = backend
            .compress_block(&block)
            .map_err(|e| PipelineError::codec(block.sequence, e))?;
        Ok(CompressedBlock {
            sequence: block.sequence,
            checksum: compute_checksum(&block.data),
            original_size: block.size,
            payload,
        })
    }
}

/// Frame -> Block, verifying the frame checksum.
#[derive(Debug, Clone, Copy)]
pub struct DecompressTask {
    pub max_block_size: usize,
}

impl WorkerTask for DecompressTask {
    type Input = Frame;
    type Output = Block;

    const STAGE: Stage = Stage::Decompress;

    fn process(&self, backend: &mut dyn CompressionBackend, frame: Frame) -> Result<Block> {
        let data = backend
            .decompress_block(&frame, self.max_block_size)
            .map_err(|e| PipelineError::codec(frame.sequence, e))?;
        if data.is_empty() {
            return Err(PipelineError::codec(frame.sequence, "frame decoded to an empty block"));
        }
        verify_checksum(frame.checksum, &data).map_err(|e| PipelineError::codec(frame.sequence, e))?;
        Ok(Block::new(frame.sequence, data))
    }
}

/// Running set of codec workers.
pub struct CodecWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl CodecWorkerPool {
    /// Build one backend per worker, then start the workers.
    ///
    /// Backends are created up front so a factory failure surfaces before
    /// any thread runs.
    pub fn spawn<T: WorkerTask>(
        worker_count: usize,
        task: Arc<T>,
        factory: &dyn BackendFactory,
        spec: CodecSpec,
        input: Receiver<T::Input>,
        output: CompletionQueue<Completed<T::Output>>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let backends = (0..worker_count.max(1))
            .map(|id| factory.make_backend(id, spec).map_err(PipelineError::codec_setup))
            .collect::<Result<Vec<_>>>()?;

        let mut handles = Vec::with_capacity(backends.len());
        for (worker_id, backend) in backends.into_iter().enumerate() {
            let task = Arc::clone(&task);
            let input = input.clone();
            let output = output.clone();
            let cancel = cancel.clone();
            let spawned = thread::Builder::new()
                .name(format!("blockpress-worker-{worker_id}"))
                .spawn(move || run_worker(worker_id, task, backend, input, output, cancel));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Workers already started exit once the caller cancels.
                    return Err(PipelineError::internal(None, e));
                }
            }
        }

        debug!(target: "blockpress::worker", workers = handles.len(), codec = %spec.codec, "worker pool started");
        Ok(Self { handles })
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    pub fn into_handles(self) -> Vec<JoinHandle<()>> {
        self.handles
    }
}

fn run_worker<T: WorkerTask>(
    worker_id: usize,
    task: Arc<T>,
    mut backend: Box<dyn CompressionBackend>,
    input: Receiver<T::Input>,
    output: CompletionQueue<Completed<T::Output>>,
    cancel: CancellationToken,
) {
    let mut processed = 0u64;
    loop {
        let item = match recv_with_cancel(&input, &cancel) {
            Ok(Some(item)) => item,
            Ok(None) | Err(_) => break,
        };

        let sequence = item.sequence();
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| task.process(backend.as_mut(), item)))
            .unwrap_or_else(|panic| {
                Err(PipelineError::codec(sequence, format!("worker panicked: {}", panic_message(&*panic))))
            });

        match result {
            Ok(item) => {
                trace!(target: "blockpress::worker", worker = worker_id, sequence, stage = %T::STAGE, "block done");
                let done = Completed { item, worker_id, elapsed: start.elapsed() };
                if output.push(done, &cancel).is_err() {
                    break;
                }
                processed += 1;
            }
            Err(err) => {
                warn!(target: "blockpress::worker", worker = worker_id, sequence, error = %err, "block failed");
                output.push_error(err, &cancel);
                break;
            }
        }
    }
    debug!(target: "blockpress::worker", worker = worker_id, processed, "worker stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
