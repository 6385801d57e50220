//! YUV 4:2:0 frame streaming protocol.
//!
//! Frames leave the sink as a sequence of self-describing records:
//! - a 12-byte dimension record (`"YUV4"`, u32 LE width, u32 LE height),
//!   sent first and again whenever the frame size changes
//! - a frame record: i64 LE microsecond timestamp followed by the tightly
//!   packed Y, U and V planes
//!
//! [`FrameEncoder`] produces those bytes on any `Write`, [`FrameReader`]
//! parses them back, and [`FramePipeSink`] ties the encoder to a named pipe.

pub mod codec;
pub mod encoder;
pub mod error;
pub mod format;
pub mod reader;

#[cfg(unix)]
pub mod sink;

pub use codec::{
    decode_record, encode_dimension_record, encode_timestamp, FrameRecord, Record,
    DIMENSION_RECORD_SIZE, DIMENSION_TAG, TIMESTAMP_SIZE,
};
pub use encoder::FrameEncoder;
pub use error::{EncodeError, FrameError, RecordKind, Result, SinkError, WriteFailure};
pub use format::{
    Dimensions, Plane, PlaneKind, StreamParams, TimeBase, TimestampRounding, VideoFrame,
};
pub use reader::{FrameReader, ReaderConfig, DEFAULT_MAX_FRAME_SIZE};

#[cfg(unix)]
pub use sink::{FramePipeSink, FrameSink, SinkConfig};
