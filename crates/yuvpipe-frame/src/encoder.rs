use std::io::{ErrorKind, IoSlice, Write};

use tracing::{debug, error, info, warn};

use crate::codec::{
    encode_dimension_record, encode_timestamp, DIMENSION_RECORD_SIZE, TIMESTAMP_SIZE,
};
use crate::error::{EncodeError, RecordKind, WriteFailure};
use crate::format::{Dimensions, PlaneKind, StreamParams, VideoFrame};

/// Serializes frames into the wire protocol on a caller-supplied writer.
///
/// Holds the per-session state: last announced dimensions, the time base,
/// the stopped latch, and a grow-only scratch buffer for frames whose
/// planes carry stride padding.
///
/// Each record is issued as exactly one write call. A short count is not
/// resumed: it stops the session, as does any other write error.
#[derive(Debug)]
pub struct FrameEncoder {
    params: StreamParams,
    last_dimensions: Dimensions,
    stopped: bool,
    scratch: Vec<u8>,
    frames_written: u64,
    bytes_written: u64,
}

impl FrameEncoder {
    pub fn new(params: StreamParams) -> Self {
        Self {
            params,
            last_dimensions: Dimensions::UNSET,
            stopped: false,
            scratch: Vec::new(),
            frames_written: 0,
            bytes_written: 0,
        }
    }

    /// Write one frame: a dimension record if the size changed, then the
    /// timestamp, then the packed planes.
    ///
    /// Once any write fails the encoder is stopped for good and every later
    /// call returns [`EncodeError::Stopped`] without touching `out`.
    pub fn push<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        frame: &VideoFrame<'_>,
    ) -> Result<(), EncodeError> {
        if self.stopped {
            return Err(EncodeError::Stopped);
        }

        let result = self.encode(out, frame);
        if let Err(err) = &result {
            self.stopped = true;
            match err {
                err if err.is_reader_disconnected() => debug!("reader disconnected"),
                EncodeError::TransportFailed {
                    record: RecordKind::Dimensions,
                    source,
                } => error!(%source, "failed to write dimension record"),
                err => warn!(%err, "frame write failed, stopping sink"),
            }
        }
        result
    }

    fn encode<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        frame: &VideoFrame<'_>,
    ) -> Result<(), EncodeError> {
        let dimensions = frame.dimensions();
        if dimensions != self.last_dimensions {
            write_once(out, &encode_dimension_record(dimensions))
                .map_err(|source| failed(RecordKind::Dimensions, source))?;
            self.last_dimensions = dimensions;
            self.bytes_written += DIMENSION_RECORD_SIZE as u64;
            info!(
                width = dimensions.width,
                height = dimensions.height,
                "dimension record written"
            );
        }

        let timestamp_us = self.params.timestamp_micros(frame.pts());
        write_once(out, &encode_timestamp(timestamp_us))
            .map_err(|source| failed(RecordKind::Timestamp, source))?;
        self.bytes_written += TIMESTAMP_SIZE as u64;

        let payload = if frame.is_packed() {
            self.write_direct(out, frame)
        } else {
            self.write_buffered(out, frame)
        };
        payload.map_err(|source| failed(RecordKind::Payload, source))?;

        self.bytes_written += dimensions.frame_size() as u64;
        self.frames_written += 1;
        Ok(())
    }

    /// Unpadded planes go out as one vectored write, no copy.
    fn write_direct<W: Write + ?Sized>(
        &self,
        out: &mut W,
        frame: &VideoFrame<'_>,
    ) -> Result<(), WriteFailure> {
        let mut slices = [IoSlice::new(&[]); 3];
        for kind in PlaneKind::ALL {
            let plane = frame.packed_plane(kind).unwrap_or_default();
            slices[kind.index()] = IoSlice::new(plane);
        }

        let expected = frame.dimensions().frame_size();
        let written = retry_interrupted(|| out.write_vectored(&slices))?;
        check_length(written, expected)
    }

    /// Padded planes are repacked row by row into the scratch buffer and
    /// written with a single call.
    fn write_buffered<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        frame: &VideoFrame<'_>,
    ) -> Result<(), WriteFailure> {
        let size = frame.dimensions().frame_size();
        self.grow_scratch(size)?;

        let packed = &mut self.scratch[..size];
        let mut offset = 0usize;
        for kind in PlaneKind::ALL {
            for row in frame.plane_rows(kind) {
                packed[offset..offset + row.len()].copy_from_slice(row);
                offset += row.len();
            }
        }
        debug_assert_eq!(offset, size);

        write_once(out, packed)
    }

    fn grow_scratch(&mut self, size: usize) -> Result<(), WriteFailure> {
        if self.scratch.len() >= size {
            return Ok(());
        }
        self.scratch
            .try_reserve_exact(size - self.scratch.len())
            .map_err(|_| {
                error!(size, "failed to allocate frame buffer");
                WriteFailure::Alloc { size }
            })?;
        self.scratch.resize(size, 0);
        debug!(size, "grew frame buffer");
        Ok(())
    }

    /// Microsecond timestamp the next frame with `pts` would carry.
    pub fn timestamp_micros(&self, pts: Option<i64>) -> i64 {
        self.params.timestamp_micros(pts)
    }

    /// Whether an earlier write failure has stopped this encoder.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Dimensions most recently announced to the reader.
    pub fn last_dimensions(&self) -> Dimensions {
        self.last_dimensions
    }

    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    /// Current size of the scratch buffer; zero until a padded frame arrives.
    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Total bytes written, records and payloads included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

fn failed(record: RecordKind, source: WriteFailure) -> EncodeError {
    EncodeError::TransportFailed { record, source }
}

fn write_once<W: Write + ?Sized>(out: &mut W, buf: &[u8]) -> Result<(), WriteFailure> {
    let written = retry_interrupted(|| out.write(buf))?;
    check_length(written, buf.len())
}

fn retry_interrupted(
    mut op: impl FnMut() -> std::io::Result<usize>,
) -> Result<usize, WriteFailure> {
    loop {
        match op() {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
}

fn check_length(written: usize, expected: usize) -> Result<(), WriteFailure> {
    if written == expected {
        Ok(())
    } else {
        Err(WriteFailure::ShortWrite { written, expected })
    }
}
