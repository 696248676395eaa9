//! Normalized input sources and output sinks for the public entry points.

use std::fs::File;
use std::io::{BufWriter, Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::stream::durable::DurableWrite;
use crate::types::{PipelineError, Result};

/// Where pipeline input comes from.
pub enum InputSource {
    Reader(Box<dyn Read + Send>),
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Where pipeline output goes.
pub enum OutputSink {
    Writer(Box<dyn DurableWrite>),
    /// Created or truncated; synced to disk when the run finishes.
    File(PathBuf),
    /// Collected into [`TelemetrySnapshot::output`](crate::telemetry::TelemetrySnapshot::output).
    Memory,
}

impl From<Vec<u8>> for InputSource {
    fn from(bytes: Vec<u8>) -> Self {
        InputSource::Memory(bytes)
    }
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        InputSource::File(path)
    }
}

pub fn open_input(src: InputSource) -> Result<Box<dyn Read + Send>> {
    let reader: Box<dyn Read + Send> = match src {
        InputSource::Reader(r) => r,
        InputSource::File(path) => {
            let file = File::open(&path).map_err(|e| PipelineError::read(0, e))?;
            debug!(target: "blockpress::reader", path = %path.display(), "input file opened");
            Box::new(file)
        }
        InputSource::Memory(bytes) => Box::new(Cursor::new(bytes)),
    };
    Ok(reader)
}

pub fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| PipelineError::write(None, e))?;
    debug!(target: "blockpress::writer", path = %path.display(), "output file created");
    Ok(BufWriter::new(file))
}
