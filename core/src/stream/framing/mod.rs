//! Wire format of a compressed stream.
//!
//! ```text
//! [ stream header (20) ]
//! [ payload_len u32 ][ checksum u32 ][ payload ]   repeated per block
//! [ END_MARKER u32 ][ block_count u64 ][ total_uncompressed u64 ]
//! ```
//!
//! All integers are little-endian. `END_MARKER` (`u32::MAX`) is never a valid
//! payload length, so a reader tells the trailer from the next frame by the
//! length word alone.

pub mod types;
pub mod encode;
pub mod decode;

pub use types::*;
pub use encode::*;
pub use decode::*;
