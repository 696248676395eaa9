//! Blocking queue operations that wake up for cancellation.

use crossbeam::channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use thiserror::Error;

use crate::constants::POLL_INTERVAL;
use crate::stream::cancel::CancellationToken;

/// Why a blocking queue operation gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupt {
    #[error("operation cancelled")]
    Cancelled,
    #[error("peer disconnected")]
    Disconnected,
}

/// Send `item`, waiting in [`POLL_INTERVAL`] slices while the queue is full.
pub fn send_with_cancel<T>(tx: &Sender<T>, item: T, cancel: &CancellationToken) -> Result<(), Interrupt> {
    let mut item = item;
    loop {
        if cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        match tx.send_timeout(item, POLL_INTERVAL) {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(back)) => item = back,
            Err(SendTimeoutError::Disconnected(_)) => return Err(Interrupt::Disconnected),
        }
    }
}

/// Receive the next item; `Ok(None)` once every sender is gone and the queue is drained.
pub fn recv_with_cancel<T>(rx: &Receiver<T>, cancel: &CancellationToken) -> Result<Option<T>, Interrupt> {
    loop {
        if cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(item) => return Ok(Some(item)),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(None),
        }
    }
}
