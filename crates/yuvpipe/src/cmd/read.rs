use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use yuvpipe_frame::{FrameReader, Record};
use yuvpipe_transport::PipeStream;

use crate::cmd::{parse_duration, ReadArgs};
use crate::exit::{
    frame_error, io_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT,
};
use crate::output::{print_record, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    if let Some(wait) = &args.wait {
        wait_for_fifo(&args.path, parse_duration(wait)?)?;
    }

    let stream =
        PipeStream::connect_reader(&args.path).map_err(|err| transport_error("attach failed", err))?;
    info!(path = ?args.path, "attached to fifo");

    let mut frames = 0u64;
    for record in FrameReader::new(stream) {
        let record = record.map_err(|err| frame_error("read failed", err))?;
        if let Err(err) = print_record(&record, format) {
            debug!(frames, %err, "stdout closed, detaching from fifo");
            return Err(io_error("write to stdout failed", err));
        }

        if let Record::Frame(_) = record {
            frames += 1;
            if args.count.is_some_and(|count| frames >= count) {
                debug!(frames, "frame count reached");
                return Ok(SUCCESS);
            }
        }
    }

    info!(frames, "writer closed the pipe");
    Ok(SUCCESS)
}

fn wait_for_fifo(path: &Path, timeout: Duration) -> CliResult<()> {
    let start = Instant::now();
    loop {
        if let Ok(metadata) = std::fs::symlink_metadata(path) {
            if metadata.file_type().is_fifo() {
                return Ok(());
            }
        }
        if start.elapsed() >= timeout {
            return Err(CliError::new(
                TIMEOUT,
                format!("no fifo at {} after {timeout:?}", path.display()),
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
