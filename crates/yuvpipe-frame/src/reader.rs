use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_record, FrameRecord, Record};
use crate::error::{FrameError, Result};
use crate::format::Dimensions;

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Default upper bound on a single frame payload: 64 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Configuration for the record reader.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Largest frame payload the reader will buffer. Default: 64 MiB.
    pub max_frame_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Reads records from any `Read` stream carrying the sink's wire protocol.
///
/// Handles partial reads internally and tracks the most recent dimension
/// record, so callers always get complete, correctly sized frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    chunk: Box<[u8]>,
    dimensions: Option<Dimensions>,
    config: ReaderConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ReaderConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: ReaderConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            dimensions: None,
            config,
        }
    }

    /// Read the next record (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached,
    /// whether or not a record was partially received.
    pub fn read_record(&mut self) -> Result<Record> {
        loop {
            if let Some(record) =
                decode_record(&mut self.buf, self.dimensions, self.config.max_frame_size)?
            {
                if let Record::Dimensions(dimensions) = record {
                    self.dimensions = Some(dimensions);
                }
                return Ok(record);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&self.chunk[..read]);
        }
    }

    /// Read the next frame, absorbing any dimension records before it.
    pub fn read_frame(&mut self) -> Result<FrameRecord> {
        loop {
            if let Record::Frame(frame) = self.read_record()? {
                return Ok(frame);
            }
        }
    }

    /// Dimensions announced by the most recent dimension record.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Record>;

    /// Yields records until the stream ends cleanly between records.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Err(FrameError::ConnectionClosed) if self.buf.is_empty() => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{encode_dimension_record, encode_timestamp};
    use crate::encoder::FrameEncoder;
    use crate::format::{StreamParams, TimeBase, VideoFrame};

    fn encode_frames(frames: &[(u32, u32, Option<i64>)]) -> Vec<u8> {
        let mut encoder = FrameEncoder::new(StreamParams::new(TimeBase::new(1, 1000).unwrap()));
        let mut wire = Vec::new();
        for (i, &(w, h, pts)) in frames.iter().enumerate() {
            let data = vec![i as u8; Dimensions::new(w, h).frame_size()];
            let frame = VideoFrame::from_packed(w, h, &data, pts).unwrap();
            encoder.push(&mut wire, &frame).unwrap();
        }
        wire
    }

    #[test]
    fn reads_records_in_order() {
        let wire = encode_frames(&[(8, 4, Some(1)), (8, 4, Some(2)), (4, 2, None)]);
        let mut reader = FrameReader::new(Cursor::new(wire));

        assert_eq!(
            reader.read_record().unwrap(),
            Record::Dimensions(Dimensions::new(8, 4))
        );
        let first = reader.read_frame().unwrap();
        assert_eq!(first.timestamp_us, 1000);
        assert_eq!(first.payload.len(), 48);

        let second = reader.read_frame().unwrap();
        assert_eq!(second.timestamp_us, 2000);
        assert!(second.payload.iter().all(|&b| b == 1));

        let third = reader.read_frame().unwrap();
        assert_eq!(third.dimensions, Dimensions::new(4, 2));
        assert_eq!(third.timestamp_us, 0);
        assert_eq!(reader.dimensions(), Some(Dimensions::new(4, 2)));

        assert!(matches!(
            reader.read_record(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn iterator_ends_cleanly_at_record_boundary() {
        let wire = encode_frames(&[(2, 2, Some(5)), (2, 2, Some(6))]);
        let records: Vec<Record> = FrameReader::new(Cursor::new(wire))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn truncated_stream_reports_connection_closed() {
        let mut wire = encode_frames(&[(4, 4, Some(1))]);
        wire.truncate(wire.len() - 3);

        let mut reader = FrameReader::new(Cursor::new(wire));
        assert!(matches!(reader.next(), Some(Ok(Record::Dimensions(_)))));
        assert!(matches!(
            reader.next(),
            Some(Err(FrameError::ConnectionClosed))
        ));
    }

    #[test]
    fn handles_one_byte_reads() {
        let wire = encode_frames(&[(6, 4, Some(9)), (2, 2, Some(10))]);
        let mut reader = FrameReader::new(OneByteReader {
            data: wire,
            pos: 0,
        });

        let a = reader.read_frame().unwrap();
        let b = reader.read_frame().unwrap();
        assert_eq!(a.dimensions, Dimensions::new(6, 4));
        assert_eq!(a.timestamp_us, 9000);
        assert_eq!(b.dimensions, Dimensions::new(2, 2));
        assert_eq!(b.timestamp_us, 10_000);
    }

    #[test]
    fn rejects_frame_larger_than_configured() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&encode_dimension_record(Dimensions::new(4096, 4096)));
        wire.extend_from_slice(&encode_timestamp(0));

        let cfg = ReaderConfig {
            max_frame_size: 1024 * 1024,
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire), cfg);
        assert!(matches!(reader.read_record(), Ok(Record::Dimensions(_))));
        assert!(matches!(
            reader.read_record(),
            Err(FrameError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn timestamp_without_dimensions_is_rejected() {
        let mut reader = FrameReader::new(Cursor::new(encode_timestamp(17).to_vec()));
        assert!(matches!(
            reader.read_record(),
            Err(FrameError::MissingDimensions)
        ));
    }

    struct OneByteReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for OneByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }
}
