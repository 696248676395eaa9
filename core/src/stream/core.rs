//! Stable public API: one call per run.

use crate::config::{Mode, PipelineConfig};
use crate::stream::io::{create_output, open_input, InputSource, OutputSink};
use crate::stream::pipeline::PipelineController;
use crate::telemetry::TelemetrySnapshot;
use crate::types::Result;

/// Compress `input` into the framed stream format.
pub fn compress_stream(
    input: InputSource,
    output: OutputSink,
    config: &PipelineConfig,
) -> Result<TelemetrySnapshot> {
    let config = PipelineConfig { mode: Mode::Compress, ..config.clone() };
    run_stream(input, output, &config)
}

/// Restore the original bytes from a framed stream.
pub fn decompress_stream(
    input: InputSource,
    output: OutputSink,
    config: &PipelineConfig,
) -> Result<TelemetrySnapshot> {
    let config = PipelineConfig { mode: Mode::Decompress, ..config.clone() };
    run_stream(input, output, &config)
}

/// Run one job in `config.mode`.
pub fn run_stream(
    input: InputSource,
    output: OutputSink,
    config: &PipelineConfig,
) -> Result<TelemetrySnapshot> {
    let mut controller = PipelineController::new(config.clone())?;
    let reader = open_input(input)?;

    match output {
        OutputSink::Writer(writer) => controller.run(reader, writer),
        OutputSink::File(path) => controller.run(reader, create_output(&path)?),
        OutputSink::Memory => {
            let mut buf = Vec::new();
            let mut snapshot = controller.run(reader, &mut buf)?;
            snapshot.attach_output(buf);
            Ok(snapshot)
        }
    }
}
