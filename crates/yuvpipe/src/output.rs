use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use yuvpipe_frame::{PlaneKind, Record};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RecordOutput {
    Dimensions {
        width: u32,
        height: u32,
    },
    Frame {
        width: u32,
        height: u32,
        timestamp_us: i64,
        payload_size: usize,
        mean_luma: f64,
    },
}

impl RecordOutput {
    fn from_record(record: &Record) -> Self {
        match record {
            Record::Dimensions(dims) => RecordOutput::Dimensions {
                width: dims.width,
                height: dims.height,
            },
            Record::Frame(frame) => RecordOutput::Frame {
                width: frame.dimensions.width,
                height: frame.dimensions.height,
                timestamp_us: frame.timestamp_us,
                payload_size: frame.payload.len(),
                mean_luma: mean(frame.plane(PlaneKind::Y)),
            },
        }
    }
}

/// Print one record to stdout.
///
/// Errors are returned rather than swallowed so a reader whose stdout
/// consumer has gone away stops draining the pipe.
pub fn print_record(record: &Record, format: OutputFormat) -> io::Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            let line = serde_json::to_string(&RecordOutput::from_record(record))
                .map_err(io::Error::other)?;
            writeln!(out, "{line}")?;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["RECORD", "SIZE", "TIMESTAMP_US", "BYTES", "MEAN_Y"]);
            match RecordOutput::from_record(record) {
                RecordOutput::Dimensions { width, height } => {
                    table.add_row(vec![
                        "DIMENSIONS".to_string(),
                        format!("{width}x{height}"),
                        "-".to_string(),
                        "-".to_string(),
                        "-".to_string(),
                    ]);
                }
                RecordOutput::Frame {
                    width,
                    height,
                    timestamp_us,
                    payload_size,
                    mean_luma,
                } => {
                    table.add_row(vec![
                        "FRAME".to_string(),
                        format!("{width}x{height}"),
                        timestamp_us.to_string(),
                        payload_size.to_string(),
                        format!("{mean_luma:.1}"),
                    ]);
                }
            }
            writeln!(out, "{table}")?;
        }
        OutputFormat::Pretty => match RecordOutput::from_record(record) {
            RecordOutput::Dimensions { width, height } => {
                writeln!(out, "dimensions {width}x{height}")?;
            }
            RecordOutput::Frame {
                width,
                height,
                timestamp_us,
                payload_size,
                mean_luma,
            } => {
                writeln!(
                    out,
                    "frame {width}x{height} ts={timestamp_us}us bytes={payload_size} mean_y={mean_luma:.1}"
                )?;
            }
        },
        OutputFormat::Raw => {
            if let Record::Frame(frame) = record {
                write_raw(&mut out, frame.payload.as_ref())?;
            }
        }
    }
    Ok(())
}

/// What a `stream` run produced.
#[derive(Debug, Serialize)]
pub struct StreamSummary {
    pub path: String,
    pub frames: u64,
    pub bytes: u64,
    pub last_timestamp_us: Option<i64>,
    pub stopped: bool,
}

pub fn print_summary(summary: &StreamSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PIPE", "FRAMES", "BYTES", "LAST_TS_US", "STOPPED"])
                .add_row(vec![
                    summary.path.clone(),
                    summary.frames.to_string(),
                    summary.bytes.to_string(),
                    summary
                        .last_timestamp_us
                        .map_or_else(|| "-".to_string(), |ts| ts.to_string()),
                    summary.stopped.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "pipe={} frames={} bytes={} stopped={}",
                summary.path, summary.frames, summary.bytes, summary.stopped
            );
        }
    }
}

fn write_raw<W: Write>(out: &mut W, data: &[u8]) -> io::Result<()> {
    out.write_all(data)?;
    out.flush()
}

fn mean(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: u64 = data.iter().map(|&b| u64::from(b)).sum();
    sum as f64 / data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use yuvpipe_frame::{Dimensions, FrameRecord};

    #[test]
    fn frame_record_serializes_with_kind_tag() {
        let record = Record::Frame(FrameRecord {
            timestamp_us: 40_000,
            dimensions: Dimensions::new(2, 2),
            payload: vec![10, 20, 30, 40, 1, 2].into(),
        });
        let json = serde_json::to_value(RecordOutput::from_record(&record)).unwrap();
        assert_eq!(json["kind"], "frame");
        assert_eq!(json["timestamp_us"], 40_000);
        assert_eq!(json["payload_size"], 6);
        assert_eq!(json["mean_luma"], 25.0);
    }

    #[test]
    fn raw_write_reports_closed_consumer() {
        struct ClosedPipe;

        impl Write for ClosedPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = write_raw(&mut ClosedPipe, &[1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let mut sink = Vec::new();
        write_raw(&mut sink, &[1, 2, 3]).unwrap();
        assert_eq!(sink, vec![1, 2, 3]);
    }

    #[test]
    fn dimension_record_serializes_with_kind_tag() {
        let record = Record::Dimensions(Dimensions::new(640, 480));
        let json = serde_json::to_value(RecordOutput::from_record(&record)).unwrap();
        assert_eq!(json["kind"], "dimensions");
        assert_eq!(json["width"], 640);
        assert_eq!(json["height"], 480);
    }
}
