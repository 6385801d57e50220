use std::path::{Path, PathBuf};

use tracing::info;
use yuvpipe_transport::{PipeEndpoint, DEFAULT_PIPE_MODE};

use crate::encoder::FrameEncoder;
use crate::error::{EncodeError, SinkError};
use crate::format::{StreamParams, VideoFrame};

/// A consumer of decoded frames driven by an upstream pipeline.
///
/// The pipeline calls `open` once with the stream parameters, `push` once
/// per frame in delivery order, and `close` once at the end (or never if
/// `open` failed).
pub trait FrameSink {
    fn open(&mut self, params: &StreamParams) -> Result<(), SinkError>;

    fn push(&mut self, frame: &VideoFrame<'_>) -> Result<(), SinkError>;

    fn close(&mut self);
}

/// Configuration for [`FramePipeSink`].
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Where the FIFO is created.
    pub pipe_path: PathBuf,
    /// Permission mode of the FIFO. Default: `0o660`.
    pub mode: u32,
}

impl SinkConfig {
    pub fn new(pipe_path: impl Into<PathBuf>) -> Self {
        Self {
            pipe_path: pipe_path.into(),
            mode: DEFAULT_PIPE_MODE,
        }
    }
}

/// Streams YUV 4:2:0 frames into a named pipe.
///
/// `open` blocks until a reader attaches to the FIFO. After the first
/// failed write the sink is stopped: every later `push` fails without
/// touching the pipe, and only `close` remains useful.
#[derive(Debug)]
pub struct FramePipeSink {
    endpoint: PipeEndpoint,
    encoder: Option<FrameEncoder>,
}

impl FramePipeSink {
    /// Create a sink for `pipe_path` with default permissions.
    pub fn new(pipe_path: impl AsRef<Path>) -> Self {
        Self::with_config(SinkConfig::new(pipe_path.as_ref()))
    }

    /// Create a sink with explicit configuration.
    pub fn with_config(config: SinkConfig) -> Self {
        Self {
            endpoint: PipeEndpoint::with_mode(&config.pipe_path, config.mode),
            encoder: None,
        }
    }

    pub fn pipe_path(&self) -> &Path {
        self.endpoint.path()
    }

    pub fn is_open(&self) -> bool {
        self.endpoint.is_open()
    }

    /// Whether a write failure has ended the current session.
    pub fn is_stopped(&self) -> bool {
        self.encoder.as_ref().is_some_and(FrameEncoder::is_stopped)
    }

    /// Encoder state of the current session, if open.
    pub fn encoder(&self) -> Option<&FrameEncoder> {
        self.encoder.as_ref()
    }
}

impl FrameSink for FramePipeSink {
    fn open(&mut self, params: &StreamParams) -> Result<(), SinkError> {
        self.endpoint.open()?;
        self.encoder = Some(FrameEncoder::new(*params));
        info!(
            path = ?self.endpoint.path(),
            time_base = %params.time_base,
            "streaming YUV420P frames with timestamps"
        );
        Ok(())
    }

    fn push(&mut self, frame: &VideoFrame<'_>) -> Result<(), SinkError> {
        let encoder = self.encoder.as_mut().ok_or(EncodeError::NotOpen)?;
        if encoder.is_stopped() {
            return Err(EncodeError::Stopped.into());
        }
        let stream = self.endpoint.stream_mut().ok_or(EncodeError::NotOpen)?;
        encoder.push(stream, frame)?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            info!(
                frames = encoder.frames_written(),
                bytes = encoder.bytes_written(),
                "frame pipe sink closed"
            );
        }
        self.endpoint.close();
    }
}

impl Drop for FramePipeSink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::FileTypeExt;
    use std::time::{Duration, Instant};

    use yuvpipe_transport::PipeStream;

    use super::*;
    use crate::codec::Record;
    use crate::error::{FrameError, RecordKind, WriteFailure};
    use crate::format::{Dimensions, Plane, PlaneKind, TimeBase};
    use crate::reader::FrameReader;

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("yuvpipe-sink-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn wait_for_fifo(path: &Path) {
        let start = Instant::now();
        while !std::fs::symlink_metadata(path)
            .map(|m| m.file_type().is_fifo())
            .unwrap_or(false)
        {
            assert!(start.elapsed() < Duration::from_secs(5), "fifo never appeared");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn spawn_reader(path: PathBuf) -> std::thread::JoinHandle<Vec<Record>> {
        std::thread::spawn(move || {
            wait_for_fifo(&path);
            let stream = PipeStream::connect_reader(&path).unwrap();
            FrameReader::new(stream)
                .collect::<Result<Vec<_>, FrameError>>()
                .unwrap()
        })
    }

    #[test]
    fn streams_scenario_through_fifo() {
        let dir = test_dir("scenario");
        let fifo_path = dir.join("frames.fifo");
        let reader = spawn_reader(fifo_path.clone());

        let mut sink = FramePipeSink::new(&fifo_path);
        sink.open(&StreamParams::new(TimeBase::MICROSECONDS)).unwrap();

        let big = vec![0x10u8; Dimensions::new(64, 48).frame_size()];
        let small = vec![0x20u8; Dimensions::new(32, 24).frame_size()];
        sink.push(&VideoFrame::from_packed(64, 48, &big, Some(1000)).unwrap())
            .unwrap();
        sink.push(&VideoFrame::from_packed(64, 48, &big, Some(2000)).unwrap())
            .unwrap();
        sink.push(&VideoFrame::from_packed(32, 24, &small, Some(3000)).unwrap())
            .unwrap();
        sink.close();

        let records = reader.join().unwrap();
        let summary: Vec<String> = records
            .iter()
            .map(|r| match r {
                Record::Dimensions(d) => format!("dims {d}"),
                Record::Frame(f) => format!("frame {} {}", f.timestamp_us, f.payload.len()),
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                "dims 64x48",
                "frame 1000 4608",
                "frame 2000 4608",
                "dims 32x24",
                "frame 3000 1152",
            ]
        );
        assert!(!fifo_path.exists(), "close should remove the fifo");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn padded_frames_arrive_packed() {
        let dir = test_dir("padded");
        let fifo_path = dir.join("padded.fifo");
        let reader = spawn_reader(fifo_path.clone());

        let mut sink = FramePipeSink::new(&fifo_path);
        sink.open(&StreamParams::new(TimeBase::new(1, 90_000).unwrap()))
            .unwrap();

        // 4x2 frame, 8-byte luma stride and 4-byte chroma stride.
        let y = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8];
        let u = [9, 10];
        let v = [11, 12];
        let frame = VideoFrame::new(
            4,
            2,
            [Plane::new(&y, 8), Plane::new(&u, 4), Plane::new(&v, 4)],
            Some(45_000),
        )
        .unwrap();
        sink.push(&frame).unwrap();
        sink.close();

        let records = reader.join().unwrap();
        let Record::Frame(frame) = &records[1] else {
            panic!("expected frame record");
        };
        assert_eq!(frame.timestamp_us, 500_000);
        assert_eq!(frame.payload.as_ref(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn frames_larger_than_pipe_buffer_arrive_whole() {
        let dir = test_dir("large");
        let fifo_path = dir.join("large.fifo");
        let reader = spawn_reader(fifo_path.clone());

        let dims = Dimensions::new(640, 480);
        let packed: Vec<u8> = (0..dims.frame_size()).map(|i| (i % 251) as u8).collect();

        // Same pixels with 32 bytes of padding per row.
        let pad = 32;
        let mut offset = 0;
        let planes = PlaneKind::ALL.map(|kind| {
            let (row_width, rows) = dims.plane_geometry(kind);
            let mut plane = Vec::with_capacity((row_width + pad) * rows);
            for _ in 0..rows {
                plane.extend_from_slice(&packed[offset..offset + row_width]);
                plane.resize(plane.len() + pad, 0xEE);
                offset += row_width;
            }
            plane
        });

        let mut sink = FramePipeSink::new(&fifo_path);
        sink.open(&StreamParams::new(TimeBase::MICROSECONDS)).unwrap();

        let direct = VideoFrame::from_packed(640, 480, &packed, Some(1)).unwrap();
        assert!(direct.is_packed());
        sink.push(&direct).unwrap();

        let padded = VideoFrame::new(
            640,
            480,
            [
                Plane::new(&planes[0], 640 + pad),
                Plane::new(&planes[1], 320 + pad),
                Plane::new(&planes[2], 320 + pad),
            ],
            Some(2),
        )
        .unwrap();
        assert!(!padded.is_packed());
        sink.push(&padded).unwrap();

        assert!(!sink.is_stopped());
        assert_eq!(sink.encoder().map(FrameEncoder::frames_written), Some(2));
        sink.close();

        let records = reader.join().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], Record::Dimensions(dims));
        for (record, ts) in records[1..].iter().zip([1, 2]) {
            let Record::Frame(frame) = record else {
                panic!("expected frame record");
            };
            assert_eq!(frame.timestamp_us, ts);
            assert_eq!(frame.payload.len(), 460_800);
            assert!(frame.payload.as_ref() == packed.as_slice());
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reader_disconnect_stops_sink() {
        let dir = test_dir("disconnect");
        let fifo_path = dir.join("gone.fifo");
        let path_clone = fifo_path.clone();
        let reader = std::thread::spawn(move || {
            wait_for_fifo(&path_clone);
            drop(PipeStream::connect_reader(&path_clone).unwrap());
        });

        let mut sink = FramePipeSink::new(&fifo_path);
        sink.open(&StreamParams::new(TimeBase::MICROSECONDS)).unwrap();
        reader.join().unwrap();

        let data = vec![0u8; Dimensions::new(16, 16).frame_size()];
        let frame = VideoFrame::from_packed(16, 16, &data, Some(1)).unwrap();
        let err = sink.push(&frame).unwrap_err();
        match &err {
            SinkError::Encode(encode) => {
                assert!(encode.is_reader_disconnected());
                assert!(matches!(
                    encode,
                    EncodeError::TransportFailed {
                        record: RecordKind::Dimensions,
                        source: WriteFailure::ReaderDisconnected,
                    }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.is_stopped());
        assert!(matches!(
            sink.push(&frame),
            Err(SinkError::Encode(EncodeError::Stopped))
        ));

        sink.close();
        assert!(!fifo_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn push_before_open_fails() {
        let mut sink = FramePipeSink::new("/nonexistent/yuvpipe.fifo");
        let data = vec![0u8; Dimensions::new(2, 2).frame_size()];
        let frame = VideoFrame::from_packed(2, 2, &data, None).unwrap();
        assert!(matches!(
            sink.push(&frame),
            Err(SinkError::Encode(EncodeError::NotOpen))
        ));
    }

    #[test]
    fn open_failure_leaves_sink_closed() {
        let fifo_path = std::env::temp_dir()
            .join(format!("yuvpipe-sink-missing-{}", std::process::id()))
            .join("frames.fifo");
        let mut sink = FramePipeSink::new(&fifo_path);
        let err = sink
            .open(&StreamParams::new(TimeBase::MICROSECONDS))
            .unwrap_err();
        assert!(matches!(
            err,
            SinkError::Transport(yuvpipe_transport::TransportError::CreateFailed { .. })
        ));
        assert!(!sink.is_open());
        assert!(sink.encoder().is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let dir = test_dir("close");
        let fifo_path = dir.join("idle.fifo");

        let mut sink = FramePipeSink::new(&fifo_path);
        sink.close();
        sink.close();
        assert!(!fifo_path.exists());

        let reader = spawn_reader(fifo_path.clone());
        sink.open(&StreamParams::new(TimeBase::MICROSECONDS)).unwrap();
        sink.close();
        sink.close();
        assert!(reader.join().unwrap().is_empty());
        assert!(!fifo_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn sink_is_usable_as_trait_object() {
        let dir = test_dir("dyn");
        let fifo_path = dir.join("dyn.fifo");
        let reader = spawn_reader(fifo_path.clone());

        let mut sink: Box<dyn FrameSink> = Box::new(FramePipeSink::with_config(SinkConfig {
            pipe_path: fifo_path.clone(),
            mode: 0o600,
        }));
        sink.open(&StreamParams::new(TimeBase::new(1, 30).unwrap()))
            .unwrap();
        let data = vec![7u8; Dimensions::new(2, 2).frame_size()];
        sink.push(&VideoFrame::from_packed(2, 2, &data, Some(30)).unwrap())
            .unwrap();
        drop(sink);

        let records = reader.join().unwrap();
        assert!(matches!(&records[1], Record::Frame(f) if f.timestamp_us == 1_000_000));
        assert!(!fifo_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
