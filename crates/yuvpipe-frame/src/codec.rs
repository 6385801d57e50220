use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::format::{Dimensions, PlaneKind};

/// Tag opening every dimension record.
pub const DIMENSION_TAG: [u8; 4] = *b"YUV4";

/// Dimension record: tag (4) + width (4) + height (4) = 12 bytes.
pub const DIMENSION_RECORD_SIZE: usize = 12;

/// Frame record prefix: signed microsecond timestamp.
pub const TIMESTAMP_SIZE: usize = 8;

/// Encode a dimension record.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬───────────┐
/// │ Tag (4B)     │ Width     │ Height    │
/// │ "YUV4"       │ (4B LE)   │ (4B LE)   │
/// └──────────────┴───────────┴───────────┘
/// ```
pub fn encode_dimension_record(dimensions: Dimensions) -> [u8; DIMENSION_RECORD_SIZE] {
    let mut record = [0u8; DIMENSION_RECORD_SIZE];
    let mut dst = &mut record[..];
    dst.put_slice(&DIMENSION_TAG);
    dst.put_u32_le(dimensions.width);
    dst.put_u32_le(dimensions.height);
    record
}

/// Encode the timestamp that opens a frame record.
///
/// Wire format:
/// ```text
/// ┌────────────────────┬──────────────────────────────────────┐
/// │ Timestamp (8B LE)  │ Y (w*h) │ U (w/2*h/2) │ V (w/2*h/2)  │
/// │ signed, µs         │         │             │              │
/// └────────────────────┴──────────────────────────────────────┘
/// ```
pub fn encode_timestamp(timestamp_us: i64) -> [u8; TIMESTAMP_SIZE] {
    let mut buf = [0u8; TIMESTAMP_SIZE];
    (&mut buf[..]).put_i64_le(timestamp_us);
    buf
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A dimension announcement; applies to every following frame.
    Dimensions(Dimensions),
    /// A frame with its timestamp and packed payload.
    Frame(FrameRecord),
}

/// A frame as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub timestamp_us: i64,
    pub dimensions: Dimensions,
    pub payload: Bytes,
}

impl FrameRecord {
    /// The packed bytes of one plane within the payload.
    pub fn plane(&self, kind: PlaneKind) -> &[u8] {
        let luma = self.dimensions.luma_size();
        let chroma = self.dimensions.chroma_size();
        match kind {
            PlaneKind::Y => &self.payload[..luma],
            PlaneKind::U => &self.payload[luma..luma + chroma],
            PlaneKind::V => &self.payload[luma + chroma..luma + 2 * chroma],
        }
    }
}

/// Decode one record from a buffer.
///
/// The first four bytes decide the record type: `"YUV4"` starts a dimension
/// record, anything else is the low half of a frame timestamp. Frame
/// payloads are sized from `current`, the most recently announced
/// dimensions.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete record yet.
/// On success, consumes the record bytes from the buffer.
pub fn decode_record(
    src: &mut BytesMut,
    current: Option<Dimensions>,
    max_frame_size: usize,
) -> Result<Option<Record>> {
    if src.len() < DIMENSION_TAG.len() {
        return Ok(None);
    }

    if src[..DIMENSION_TAG.len()] == DIMENSION_TAG {
        if src.len() < DIMENSION_RECORD_SIZE {
            return Ok(None);
        }
        src.advance(DIMENSION_TAG.len());
        let width = src.get_u32_le();
        let height = src.get_u32_le();
        let dimensions = Dimensions::new(width, height);
        if dimensions.is_empty() {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        return Ok(Some(Record::Dimensions(dimensions)));
    }

    let dimensions = current.ok_or(FrameError::MissingDimensions)?;
    let size = dimensions.frame_size();
    if size > max_frame_size {
        return Err(FrameError::FrameTooLarge {
            size,
            max: max_frame_size,
        });
    }

    let total = TIMESTAMP_SIZE + size;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    let timestamp_us = src.get_i64_le();
    let payload = src.split_to(size).freeze();

    Ok(Some(Record::Frame(FrameRecord {
        timestamp_us,
        dimensions,
        payload,
    })))
}
