//! Pipeline controller.
//!
//! ```text
//! reader thread ──▶ input queue ──▶ N workers ──▶ reorder window ──▶ completion queue
//!                                                                        │
//!                           caller thread: Sequencer ──▶ BlockSink ◀─────┘
//! ```
//!
//! Both queues are bounded. The first error reported on the completion queue
//! ends the run: the controller raises the cancellation flag, closes the
//! reorder window, waits up to the grace period for the other threads and
//! abandons any that are still blocked (e.g. inside a read on the input).

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, Sender};
use num_enum::TryFromPrimitive;
use tracing::{debug, error, info, trace, warn};

use crate::compression::resolve;
use crate::config::{Mode, PipelineConfig};
use crate::constants::POLL_INTERVAL;
use crate::stream::block::{Completed, Sequenced};
use crate::stream::cancel::{CancellationSource, CancellationToken};
use crate::stream::durable::DurableSink;
use crate::stream::framing::StreamHeader;
use crate::stream::parallelism::ParallelismProfile;
use crate::stream::queue::{recv_with_cancel, send_with_cancel};
use crate::stream::reader::{BlockReader, BlockSource, FrameReader};
use crate::stream::sequencer::{CompletionQueue, ReorderWindow, Sequencer};
use crate::stream::worker::{
    BackendFactory, CodecSpec, CodecWorkerPool, CompressTask, DecompressTask,
    RegistryBackendFactory, WorkerTask,
};
use crate::stream::writer::{BlockSink, PlainWriter, StreamWriter};
use crate::telemetry::{RunInfo, Stage, TelemetrySnapshot, TelemetryTimer};
use crate::types::{PipelineError, Result};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum PipelineState {
    Idle      = 0,
    Running   = 1,
    Completed = 2,
    Failed    = 3,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

/// Shared, read-only view of a controller's state.
#[derive(Debug, Clone)]
pub struct StateHandle {
    state: Arc<AtomicU8>,
}

impl StateHandle {
    fn new() -> Self {
        Self { state: Arc::new(AtomicU8::new(PipelineState::Idle as u8)) }
    }

    pub fn get(&self) -> PipelineState {
        PipelineState::try_from_primitive(self.state.load(Ordering::Acquire))
            .unwrap_or(PipelineState::Failed)
    }

    fn set(&self, state: PipelineState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Runs compress or decompress jobs and owns their lifecycle:
/// `Idle -> Running -> {Completed | Failed} -> Idle`.
pub struct PipelineController {
    config: PipelineConfig,
    profile: ParallelismProfile,
    factory: Arc<dyn BackendFactory>,
    state: StateHandle,
}

struct ReaderReport<S> {
    /// `None` when the reader stopped on an error or cancellation.
    source: Option<S>,
    elapsed: Duration,
}

impl PipelineController {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let profile = ParallelismProfile::for_config(&config);
        Ok(Self {
            config,
            profile,
            factory: Arc::new(RegistryBackendFactory),
            state: StateHandle::new(),
        })
    }

    /// Replace how workers obtain their codec backends.
    pub fn with_backend_factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_profile(mut self, profile: ParallelismProfile) -> Self {
        self.profile = ParallelismProfile {
            worker_count: profile.worker_count.max(1),
            inflight_blocks: profile.inflight_blocks.max(1),
            reorder_window: profile.reorder_window.max(1),
        };
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn profile(&self) -> &ParallelismProfile {
        &self.profile
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Return to `Idle` after a finished run.
    pub fn reset(&mut self) {
        self.state.set(PipelineState::Idle);
    }

    /// Run in the configured mode.
    pub fn run<R, W>(&mut self, input: R, sink: W) -> Result<TelemetrySnapshot>
    where
        R: Read + Send + 'static,
        W: Write + DurableSink,
    {
        match self.config.mode {
            Mode::Compress => self.run_compress(input, sink),
            Mode::Decompress => self.run_decompress(input, sink),
        }
    }

    pub fn run_compress<R, W>(&mut self, input: R, sink: W) -> Result<TelemetrySnapshot>
    where
        R: Read + Send + 'static,
        W: Write + DurableSink,
    {
        let timer = self.begin(Mode::Compress);
        let result = self.compress_inner(input, sink, timer);
        self.conclude(Mode::Compress, result)
    }

    pub fn run_decompress<R, W>(&mut self, input: R, sink: W) -> Result<TelemetrySnapshot>
    where
        R: Read + Send + 'static,
        W: Write + DurableSink,
    {
        let timer = self.begin(Mode::Decompress);
        let result = self.decompress_inner(input, sink, timer);
        self.conclude(Mode::Decompress, result)
    }

    fn begin(&mut self, mode: Mode) -> TelemetryTimer {
        if self.state.get().is_terminal() {
            self.reset();
        }
        self.state.set(PipelineState::Running);
        info!(
            target: "blockpress::pipeline",
            ?mode,
            workers = self.profile.worker_count,
            "pipeline started"
        );
        TelemetryTimer::new()
    }

    fn conclude(&mut self, mode: Mode, result: Result<TelemetrySnapshot>) -> Result<TelemetrySnapshot> {
        match &result {
            Ok(snapshot) => {
                self.state.set(PipelineState::Completed);
                info!(
                    target: "blockpress::pipeline",
                    ?mode,
                    blocks = snapshot.blocks,
                    bytes = snapshot.bytes_uncompressed,
                    elapsed_ms = snapshot.elapsed.as_millis() as u64,
                    "pipeline completed"
                );
            }
            Err(err) => {
                self.state.set(PipelineState::Failed);
                error!(
                    target: "blockpress::pipeline",
                    ?mode,
                    kind = %err.kind(),
                    sequence = ?err.sequence(),
                    error = %err,
                    "pipeline failed"
                );
            }
        }
        result
    }

    fn compress_inner<R, W>(&self, input: R, sink: W, timer: TelemetryTimer) -> Result<TelemetrySnapshot>
    where
        R: Read + Send + 'static,
        W: Write + DurableSink,
    {
        let codec = self.config.codec;
        let level = self.config.effective_level()?;
        let block_size = self.config.block_size;

        let header = StreamHeader::new(codec, block_size as u32, level);
        let info = RunInfo {
            mode: Mode::Compress,
            codec,
            level,
            block_size,
            worker_count: self.profile.worker_count,
        };

        self.execute(
            BlockReader::new(input, block_size),
            Arc::new(CompressTask),
            StreamWriter::new(sink, header),
            CodecSpec { codec, level },
            info,
            timer,
        )
    }

    fn decompress_inner<R, W>(&self, input: R, sink: W, timer: TelemetryTimer) -> Result<TelemetrySnapshot>
    where
        R: Read + Send + 'static,
        W: Write + DurableSink,
    {
        let source = FrameReader::open(input)?;
        let header = *source.header();
        let block_size = header.block_size as usize;

        // The header level is informational; decoding never depends on it.
        let spec = CodecSpec { codec: header.codec, level: resolve(header.codec).default_level };
        let info = RunInfo {
            mode: Mode::Decompress,
            codec: header.codec,
            level: header.level,
            block_size,
            worker_count: self.profile.worker_count,
        };

        self.execute(
            source,
            Arc::new(DecompressTask { max_block_size: block_size }),
            PlainWriter::new(sink),
            spec,
            info,
            timer,
        )
    }

    fn execute<S, T, K>(
        &self,
        source: S,
        task: Arc<T>,
        mut sink: K,
        spec: CodecSpec,
        info: RunInfo,
        mut timer: TelemetryTimer,
    ) -> Result<TelemetrySnapshot>
    where
        S: BlockSource<Item = T::Input>,
        T: WorkerTask,
        K: BlockSink<T::Output>,
    {
        let profile = self.profile;
        let cancel = CancellationSource::new();
        let token = cancel.token();

        // ---- Channels ----
        let (input_tx, input_rx) = bounded::<T::Input>(profile.inflight_blocks);
        let window = Arc::new(ReorderWindow::new(profile.reorder_window));
        // Window items plus one error per producer: error reports never block.
        let (done_tx, done_rx) =
            bounded::<Result<Completed<T::Output>>>(profile.reorder_window + profile.worker_count + 1);
        let completion = CompletionQueue::new(done_tx, Arc::clone(&window));

        // ---- Workers ----
        let pool = match CodecWorkerPool::spawn(
            profile.worker_count,
            task,
            self.factory.as_ref(),
            spec,
            input_rx,
            completion.clone(),
            token.clone(),
        ) {
            Ok(pool) => pool,
            Err(err) => {
                cancel.cancel();
                window.close();
                return Err(err);
            }
        };

        // ---- Reader ----
        let spawned = {
            let completion = completion.clone();
            let token = token.clone();
            thread::Builder::new()
                .name("blockpress-reader".into())
                .spawn(move || run_reader(source, input_tx, completion, token))
        };
        drop(completion);

        let reader = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.abort::<S>(&cancel, &window, None, pool);
                return Err(PipelineError::internal(None, e));
            }
        };

        // ---- Ordered consumption on this thread ----
        let mut sequencer = Sequencer::new(window.capacity());
        if let Err(err) = consume(&done_rx, &token, &mut sequencer, &window, &mut sink, &mut timer, T::STAGE) {
            drop(done_rx);
            self.abort(&cancel, &window, Some(reader), pool);
            return Err(err);
        }

        // Every producer has hung up, so the joins below return promptly.
        let report = reader
            .join()
            .map_err(|_| PipelineError::internal(None, "reader thread panicked"))?;
        for handle in pool.into_handles() {
            handle
                .join()
                .map_err(|_| PipelineError::internal(None, "worker thread panicked"))?;
        }

        // The reader only stops early when the input queue lost its workers.
        let source = report.source.ok_or_else(|| PipelineError::queue_closed("input"))?;
        if !sequencer.is_drained() {
            return Err(PipelineError::internal(
                Some(sequencer.next_expected()),
                format!("{} blocks never reached the writer", sequencer.pending_len()),
            ));
        }
        source.verify_totals(sink.blocks_written(), sink.uncompressed_bytes())?;
        sink.finish()?;

        let mut counters = sink.counters().clone();
        source.record(&mut counters);
        timer.add_stage_time(Stage::Read, report.elapsed);
        timer.stage_times.merge(sink.stage_times());
        timer.finish();

        Ok(TelemetrySnapshot::from(info, &counters, &timer))
    }

    /// Cancel everything and wait at most the grace period for threads to exit.
    fn abort<S>(
        &self,
        cancel: &CancellationSource,
        window: &ReorderWindow,
        reader: Option<JoinHandle<ReaderReport<S>>>,
        pool: CodecWorkerPool,
    ) {
        cancel.cancel();
        window.close();

        let total = pool.worker_count();
        let workers = pool.into_handles();
        let deadline = Instant::now() + self.config.grace_period;
        loop {
            let reader_done = reader.as_ref().map_or(true, JoinHandle::is_finished);
            let workers_done = workers.iter().all(JoinHandle::is_finished);
            if (reader_done && workers_done) || Instant::now() >= deadline {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }

        if let Some(reader) = reader {
            if reader.is_finished() {
                let _ = reader.join();
            } else {
                warn!(target: "blockpress::pipeline", "reader thread still blocked after grace period; abandoning it");
            }
        }

        let mut abandoned = 0usize;
        for handle in workers {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            warn!(target: "blockpress::pipeline", abandoned, total, "worker threads still busy after grace period; abandoning them");
        }
    }
}

fn run_reader<S, O>(
    mut source: S,
    tx: Sender<S::Item>,
    errors: CompletionQueue<O>,
    cancel: CancellationToken,
) -> ReaderReport<S>
where
    S: BlockSource,
    O: Sequenced,
{
    let mut elapsed = Duration::ZERO;
    let mut items = 0u64;
    loop {
        let start = Instant::now();
        let next = source.next_item();
        elapsed += start.elapsed();

        match next {
            Ok(Some(item)) => {
                if send_with_cancel(&tx, item, &cancel).is_err() {
                    debug!(target: "blockpress::reader", items, "reader interrupted");
                    return ReaderReport { source: None, elapsed };
                }
                items += 1;
            }
            Ok(None) => break,
            Err(err) => {
                warn!(target: "blockpress::reader", error = %err, "read failed");
                errors.push_error(err, &cancel);
                return ReaderReport { source: None, elapsed };
            }
        }
    }
    debug!(target: "blockpress::reader", items, "reader finished");
    ReaderReport { source: Some(source), elapsed }
}

fn consume<O, K>(
    rx: &Receiver<Result<Completed<O>>>,
    cancel: &CancellationToken,
    sequencer: &mut Sequencer<Completed<O>>,
    window: &ReorderWindow,
    sink: &mut K,
    timer: &mut TelemetryTimer,
    stage: Stage,
) -> Result<()>
where
    O: Sequenced,
    K: BlockSink<O>,
{
    loop {
        let completed = match recv_with_cancel(rx, cancel) {
            Ok(Some(result)) => result?,
            Ok(None) => return Ok(()),
            Err(_) => return Err(PipelineError::queue_closed("completion")),
        };
        timer.add_stage_time(stage, completed.elapsed);

        let ready = timer.measure(Stage::Reorder, || sequencer.admit(completed))?;
        for done in ready {
            trace!(
                target: "blockpress::sequencer",
                sequence = done.sequence(),
                worker = done.worker_id,
                "emitting block"
            );
            sink.write_block(done.item)?;
        }
        window.advance(sequencer.next_expected());
    }
}
