use std::fmt;

use yuvpipe_transport::TransportError;

use crate::format::PlaneKind;

/// Errors in frame construction and stream parsing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Width or height is zero.
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Time base numerator or denominator is not positive.
    #[error("invalid time base {num}/{den}")]
    InvalidTimeBase { num: i32, den: i32 },

    /// A plane's row stride is smaller than its logical row width.
    #[error("{plane} plane stride {linesize} is smaller than row width {row_width}")]
    InvalidStride {
        plane: PlaneKind,
        linesize: usize,
        row_width: usize,
    },

    /// A plane's backing slice cannot hold every row at its stride.
    #[error("{plane} plane holds {len} bytes, {required} required")]
    PlaneTooShort {
        plane: PlaneKind,
        len: usize,
        required: usize,
    },

    /// A frame record arrived before any dimension record.
    #[error("frame record received before any dimension record")]
    MissingDimensions,

    /// An announced frame size exceeds the reader's limit.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading records.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete record was received.
    #[error("connection closed (incomplete record)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// The record being written when a write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Dimensions,
    Timestamp,
    Payload,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Dimensions => "dimension record",
            RecordKind::Timestamp => "timestamp",
            RecordKind::Payload => "frame payload",
        })
    }
}

/// Why a single write to the transport did not complete.
#[derive(Debug, thiserror::Error)]
pub enum WriteFailure {
    /// The reader closed its end of the pipe (`EPIPE`).
    #[error("reader disconnected")]
    ReaderDisconnected,

    /// The write accepted fewer bytes than requested.
    #[error("short write ({written}/{expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// The scratch buffer could not be grown.
    #[error("failed to allocate {size} byte frame buffer")]
    Alloc { size: usize },

    /// Any other I/O error.
    #[error("{0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for WriteFailure {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            WriteFailure::ReaderDisconnected
        } else {
            WriteFailure::Io(err)
        }
    }
}

/// Errors returned by [`FrameEncoder::push`](crate::FrameEncoder::push).
///
/// Every variant leaves the encoder stopped; there is no recoverable kind.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Writing a record failed; the session is now stopped.
    #[error("failed to write {record}: {source}")]
    TransportFailed {
        record: RecordKind,
        #[source]
        source: WriteFailure,
    },

    /// An earlier write failed; no further I/O is attempted.
    #[error("sink stopped after an earlier write failure")]
    Stopped,

    /// The sink has no open transport.
    #[error("sink is not open")]
    NotOpen,
}

impl EncodeError {
    /// Whether the failure was caused by the reader going away.
    pub fn is_reader_disconnected(&self) -> bool {
        matches!(
            self,
            EncodeError::TransportFailed {
                source: WriteFailure::ReaderDisconnected,
                ..
            }
        )
    }
}

/// Errors surfaced through the [`FrameSink`](crate::FrameSink) capability.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
