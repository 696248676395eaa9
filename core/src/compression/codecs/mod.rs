//! Block codecs. Each call encodes or decodes exactly one block.

pub mod deflate;
pub mod lz4;
pub mod store;
pub mod zstd;

pub use self::deflate::*;
pub use self::lz4::*;
pub use self::store::*;
pub use self::zstd::*;
