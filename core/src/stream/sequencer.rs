//! Restores stream order after parallel processing.
//!
//! [`Sequencer`] is the reorder buffer owned by the consuming thread.
//! [`ReorderWindow`] is the backpressure gate in front of the completion
//! queue: a producer holding sequence `s` may only enqueue once
//! `s < next_expected + capacity`, which keeps the reorder buffer bounded.
//! The block at `next_expected` always passes, so the gate cannot deadlock.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crossbeam::channel::Sender;
use thiserror::Error;
use tracing::trace;

use crate::constants::POLL_INTERVAL;
use crate::stream::block::Sequenced;
use crate::stream::cancel::CancellationToken;
use crate::stream::queue::{send_with_cancel, Interrupt};
use crate::types::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequencerError {
    #[error("block {sequence} already emitted (next expected {next_expected})")]
    Stale { sequence: u64, next_expected: u64 },

    #[error("block {sequence} admitted twice")]
    Duplicate { sequence: u64 },

    #[error("block {sequence} outside reorder window [{next_expected}, +{capacity})")]
    Overflow { sequence: u64, next_expected: u64, capacity: usize },
}

impl SequencerError {
    pub fn sequence(&self) -> u64 {
        match *self {
            SequencerError::Stale { sequence, .. }
            | SequencerError::Duplicate { sequence }
            | SequencerError::Overflow { sequence, .. } => sequence,
        }
    }
}

impl From<SequencerError> for PipelineError {
    fn from(e: SequencerError) -> Self {
        PipelineError::internal(Some(e.sequence()), e)
    }
}

/// Reorder buffer emitting items strictly as 0, 1, 2, ...
#[derive(Debug)]
pub struct Sequencer<T> {
    next_expected: u64,
    pending: BTreeMap<u64, T>,
    capacity: usize,
}

impl<T: Sequenced> Sequencer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            next_expected: 0,
            pending: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Admit one item and return every item now ready, in order.
    pub fn admit(&mut self, item: T) -> std::result::Result<Vec<T>, SequencerError> {
        let sequence = item.sequence();
        if sequence < self.next_expected {
            return Err(SequencerError::Stale { sequence, next_expected: self.next_expected });
        }
        if sequence - self.next_expected >= self.capacity as u64 {
            return Err(SequencerError::Overflow {
                sequence,
                next_expected: self.next_expected,
                capacity: self.capacity,
            });
        }
        if self.pending.contains_key(&sequence) {
            return Err(SequencerError::Duplicate { sequence });
        }

        if sequence != self.next_expected {
            trace!(target: "blockpress::sequencer", sequence, next = self.next_expected, "holding early block");
            self.pending.insert(sequence, item);
            return Ok(Vec::new());
        }

        let mut ready = vec![item];
        self.next_expected += 1;
        while let Some(next) = self.pending.remove(&self.next_expected) {
            ready.push(next);
            self.next_expected += 1;
        }
        Ok(ready)
    }

    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug)]
struct WindowState {
    base: u64,
    closed: bool,
}

/// Backpressure gate shared by producers and the consumer.
#[derive(Debug)]
pub struct ReorderWindow {
    state: Mutex<WindowState>,
    cond: Condvar,
    capacity: u64,
}

impl ReorderWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(WindowState { base: 0, closed: false }),
            cond: Condvar::new(),
            capacity: capacity.max(1) as u64,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `sequence` fits in the window.
    pub fn wait_for_slot(&self, sequence: u64, cancel: &CancellationToken) -> std::result::Result<(), Interrupt> {
        let mut state = self.lock();
        loop {
            if state.closed || cancel.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
            if sequence < state.base.saturating_add(self.capacity) {
                return Ok(());
            }
            state = self
                .cond
                .wait_timeout(state, POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Slide the window to the consumer's `next_expected`.
    pub fn advance(&self, next_expected: u64) {
        let mut state = self.lock();
        if next_expected > state.base {
            state.base = next_expected;
            self.cond.notify_all();
        }
    }

    /// Release every waiter; later waits fail immediately.
    pub fn close(&self) {
        self.lock().closed = true;
        self.cond.notify_all();
    }
}

/// Producer handle on the completion queue: results go through the window,
/// errors skip it.
pub struct CompletionQueue<T> {
    tx: Sender<Result<T>>,
    window: Arc<ReorderWindow>,
}

impl<T> Clone for CompletionQueue<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone(), window: Arc::clone(&self.window) }
    }
}

impl<T: Sequenced> CompletionQueue<T> {
    pub fn new(tx: Sender<Result<T>>, window: Arc<ReorderWindow>) -> Self {
        Self { tx, window }
    }

    pub fn push(&self, item: T, cancel: &CancellationToken) -> std::result::Result<(), Interrupt> {
        self.window.wait_for_slot(item.sequence(), cancel)?;
        send_with_cancel(&self.tx, Ok(item), cancel)
    }

    /// Report a failure. Dropped silently once the run is already cancelled.
    pub fn push_error(&self, err: PipelineError, cancel: &CancellationToken) {
        let _ = send_with_cancel(&self.tx, Err(err), cancel);
    }
}
