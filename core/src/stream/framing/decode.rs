use byteorder::{ByteOrder, LittleEndian};

use crate::compression::CompressionCodec;
use crate::constants::{END_MARKER, FORMAT_VERSION, MAGIC, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::stream::framing::types::{
    FrameHeader, FramingError, RecordTag, StreamFlags, StreamHeader, Trailer,
};

pub fn decode_stream_header(wire: &[u8]) -> Result<StreamHeader, FramingError> {
    if wire.len() < StreamHeader::LEN {
        return Err(FramingError::Truncated("stream header"));
    }

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&wire[0..4]);
    if magic != MAGIC {
        return Err(FramingError::InvalidMagic(magic));
    }

    let version = LittleEndian::read_u16(&wire[4..6]);
    if version != FORMAT_VERSION {
        return Err(FramingError::UnsupportedVersion(version));
    }

    let codec_id = LittleEndian::read_u16(&wire[6..8]);
    let codec = CompressionCodec::from_id(codec_id)
        .map_err(|_| FramingError::UnsupportedCodec(codec_id))?;

    // Only independent-block streams can be decoded in parallel.
    let raw_flags = LittleEndian::read_u16(&wire[8..10]);
    let flags = StreamFlags::from_bits(raw_flags)
        .filter(|f| f.contains(StreamFlags::INDEPENDENT_BLOCKS))
        .ok_or(FramingError::UnsupportedFlags(raw_flags))?;

    let reserved = LittleEndian::read_u16(&wire[10..12]);
    if reserved != 0 {
        return Err(FramingError::NonZeroReserved(reserved));
    }

    let block_size = LittleEndian::read_u32(&wire[12..16]);
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&(block_size as usize)) {
        return Err(FramingError::InvalidBlockSize(block_size));
    }

    let level = LittleEndian::read_i32(&wire[16..20]);

    Ok(StreamHeader { version, codec, flags, block_size, level })
}

/// Classify a length word: a frame of `payload_len` bytes, or the end marker.
pub fn decode_record_tag(word: [u8; 4], max_payload: usize) -> Result<RecordTag, FramingError> {
    let value = u32::from_le_bytes(word);
    if value == END_MARKER {
        return Ok(RecordTag::End);
    }
    if value == 0 {
        return Err(FramingError::EmptyFrame);
    }
    if value as usize > max_payload {
        return Err(FramingError::FrameTooLarge { len: value as usize, max: max_payload });
    }
    Ok(RecordTag::Frame { payload_len: value })
}

pub fn decode_frame_header(wire: &[u8]) -> Result<FrameHeader, FramingError> {
    if wire.len() < FrameHeader::LEN {
        return Err(FramingError::Truncated("frame header"));
    }
    Ok(FrameHeader {
        payload_len: LittleEndian::read_u32(&wire[0..4]),
        checksum: LittleEndian::read_u32(&wire[4..8]),
    })
}

/// Decode the trailer body (the end marker already consumed).
pub fn decode_trailer(wire: &[u8]) -> Result<Trailer, FramingError> {
    if wire.len() < Trailer::LEN {
        return Err(FramingError::Truncated("trailer"));
    }
    Ok(Trailer {
        block_count: LittleEndian::read_u64(&wire[0..8]),
        total_uncompressed: LittleEndian::read_u64(&wire[8..16]),
    })
}
