use byteorder::{ByteOrder, LittleEndian};

use crate::constants::{END_MARKER, MAGIC};
use crate::stream::framing::types::{FrameHeader, StreamHeader, Trailer};

/// Encode the stream header.
///
/// ```text
/// [ magic (4) ][ version (2) ][ codec (2) ][ flags (2) ][ reserved (2) ]
/// [ block_size (4) ][ level (4) ]
/// ```
pub fn encode_stream_header(header: &StreamHeader) -> [u8; StreamHeader::LEN] {
    let mut out = [0u8; StreamHeader::LEN];
    out[0..4].copy_from_slice(&MAGIC);
    LittleEndian::write_u16(&mut out[4..6], header.version);
    LittleEndian::write_u16(&mut out[6..8], header.codec.id());
    LittleEndian::write_u16(&mut out[8..10], header.flags.bits());
    // out[10..12] reserved, zero
    LittleEndian::write_u32(&mut out[12..16], header.block_size);
    LittleEndian::write_i32(&mut out[16..20], header.level);
    out
}

pub fn encode_frame_header(header: &FrameHeader) -> [u8; FrameHeader::LEN] {
    let mut out = [0u8; FrameHeader::LEN];
    LittleEndian::write_u32(&mut out[0..4], header.payload_len);
    LittleEndian::write_u32(&mut out[4..8], header.checksum);
    out
}

/// End marker followed by the trailer.
pub fn encode_trailer(trailer: &Trailer) -> [u8; Trailer::WIRE_LEN] {
    let mut out = [0u8; Trailer::WIRE_LEN];
    LittleEndian::write_u32(&mut out[0..4], END_MARKER);
    LittleEndian::write_u64(&mut out[4..12], trailer.block_count);
    LittleEndian::write_u64(&mut out[12..20], trailer.total_uncompressed);
    out
}
