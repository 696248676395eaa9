use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Where a pipeline failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input source fault.
    Read,
    /// Compression, decompression or checksum failure for one block.
    Codec,
    /// Sink rejected frame or trailer bytes.
    Write,
    /// Durable flush failed after all bytes were written.
    Flush,
    /// Compressed stream is malformed at stream level (header, frame
    /// layout, trailer). Malformed block payloads are `Codec`.
    Format,
    /// Configuration rejected before the pipeline started.
    Config,
    /// A queue endpoint disappeared; never the root cause of a run.
    QueueClosed,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Read        => "read",
            ErrorKind::Codec       => "codec",
            ErrorKind::Write       => "write",
            ErrorKind::Flush       => "flush",
            ErrorKind::Format      => "format",
            ErrorKind::Config      => "config",
            ErrorKind::QueueClosed => "queue closed",
            ErrorKind::Internal    => "internal",
        };
        f.write_str(name)
    }
}

/// Terminal pipeline failure.
///
/// Carries the originating [`ErrorKind`], the sequence number of the block
/// involved (when there is one) and the underlying cause as its `source()`.
#[derive(Debug, Error)]
#[error("{kind} error{suffix}: {cause}", suffix = sequence_suffix(.sequence))]
pub struct PipelineError {
    kind: ErrorKind,
    sequence: Option<u64>,
    #[source]
    cause: BoxError,
}

fn sequence_suffix(sequence: &Option<u64>) -> String {
    match sequence {
        Some(seq) => format!(" at block {seq}"),
        None => String::new(),
    }
}

impl PipelineError {
    pub fn new(kind: ErrorKind, sequence: Option<u64>, cause: impl Into<BoxError>) -> Self {
        Self { kind, sequence, cause: cause.into() }
    }

    pub fn read(sequence: u64, cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Read, Some(sequence), cause)
    }

    pub fn codec(sequence: u64, cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Codec, Some(sequence), cause)
    }

    /// Codec failure not tied to a block (backend construction).
    pub fn codec_setup(cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Codec, None, cause)
    }

    pub fn write(sequence: Option<u64>, cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Write, sequence, cause)
    }

    pub fn flush(cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Flush, None, cause)
    }

    pub fn format(sequence: Option<u64>, cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Format, sequence, cause)
    }

    pub fn config(cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Config, None, cause)
    }

    pub fn queue_closed(queue: &'static str) -> Self {
        Self::new(ErrorKind::QueueClosed, None, format!("{queue} queue closed"))
    }

    pub fn internal(sequence: Option<u64>, cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Internal, sequence, cause)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Downcast the cause, e.g. to a `FlushError` or `io::Error`.
    pub fn cause_as<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }
}
