//! Counters, stage timers and immutable run snapshots.
//!
//! Workers measure their own stage time per block; the controller folds those
//! measurements and the writer's counters into one [`TelemetrySnapshot`] at the
//! end of a run, so no locks or atomics sit on the hot path.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
