//! Durable flush capability for output sinks.
//!
//! Files are synced with the native primitive (`fsync` / `FlushFileBuffers`
//! via [`File::sync_all`]); platform errors are classified by
//! [`classify_flush_error`]. In-memory sinks have nothing to persist.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("durable flush on an invalid handle: {0}")]
    InvalidHandle(#[source] io::Error),

    #[error("durable flush failed: {0}")]
    Io(#[source] io::Error),
}

/// Sink that can push written bytes to stable storage.
pub trait DurableSink {
    fn flush_durable(&mut self) -> Result<(), FlushError>;
}

/// Object-safe combination used for boxed sinks.
pub trait DurableWrite: Write + DurableSink + Send {}

impl<T: Write + DurableSink + Send> DurableWrite for T {}

/// Map a platform sync error.
///
/// - access denied (a read-only handle has nothing to flush): success
/// - invalid handle (`EBADF`, `EINVAL`, `ERROR_INVALID_HANDLE`): [`FlushError::InvalidHandle`]
/// - anything else: [`FlushError::Io`]
pub fn classify_flush_error(err: io::Error) -> Result<(), FlushError> {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return Ok(());
    }
    match err.raw_os_error() {
        Some(code) if is_invalid_handle(code) => Err(FlushError::InvalidHandle(err)),
        _ => Err(FlushError::Io(err)),
    }
}

#[cfg(unix)]
fn is_invalid_handle(code: i32) -> bool {
    code == libc::EBADF || code == libc::EINVAL
}

#[cfg(windows)]
fn is_invalid_handle(code: i32) -> bool {
    const ERROR_INVALID_HANDLE: i32 = 6;
    code == ERROR_INVALID_HANDLE
}

#[cfg(not(any(unix, windows)))]
fn is_invalid_handle(_code: i32) -> bool {
    false
}

impl DurableSink for File {
    fn flush_durable(&mut self) -> Result<(), FlushError> {
        self.sync_all().or_else(classify_flush_error)
    }
}

impl<W: Write + DurableSink> DurableSink for BufWriter<W> {
    fn flush_durable(&mut self) -> Result<(), FlushError> {
        self.flush().map_err(FlushError::Io)?;
        self.get_mut().flush_durable()
    }
}

impl DurableSink for Vec<u8> {
    fn flush_durable(&mut self) -> Result<(), FlushError> {
        Ok(())
    }
}

impl<T> DurableSink for Cursor<T> {
    fn flush_durable(&mut self) -> Result<(), FlushError> {
        Ok(())
    }
}

impl DurableSink for io::Sink {
    fn flush_durable(&mut self) -> Result<(), FlushError> {
        Ok(())
    }
}

impl<T: DurableSink + ?Sized> DurableSink for &mut T {
    fn flush_durable(&mut self) -> Result<(), FlushError> {
        (**self).flush_durable()
    }
}

impl<T: DurableSink + ?Sized> DurableSink for Box<T> {
    fn flush_durable(&mut self) -> Result<(), FlushError> {
        (**self).flush_durable()
    }
}
