use std::fmt;

use num_enum::TryFromPrimitive;
use thiserror::Error;

/// CRC32 (IEEE) of uncompressed block content.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
pub struct ChecksumMismatch {
    pub expected: u32,
    pub actual: u32,
}

pub fn verify_checksum(expected: u32, data: &[u8]) -> Result<(), ChecksumMismatch> {
    let actual = compute_checksum(data);
    if actual == expected {
        Ok(())
    } else {
        Err(ChecksumMismatch { expected, actual })
    }
}

pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}
