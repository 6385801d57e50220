use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use yuvpipe_frame::{Dimensions, FramePipeSink, FrameSink, StreamParams, TimeBase};

use crate::cmd::StreamArgs;
use crate::exit::{frame_error, sink_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_summary, OutputFormat, StreamSummary};
use crate::pattern::{dimensions_at, TestPattern};

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let time_base =
        TimeBase::new(1, args.fps).map_err(|err| frame_error("invalid frame rate", err))?;
    let base = Dimensions::new(args.width, args.height);

    let mut sink = FramePipeSink::new(&args.path);
    sink.open(&StreamParams::new(time_base))
        .map_err(|err| sink_error("open failed", err))?;

    // Installed after the blocking open so Ctrl-C can still abort a wait
    // for a reader that never shows up.
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut pattern = TestPattern::new(args.pad);
    let frame_interval = Duration::from_secs(1) / args.fps.unsigned_abs();
    let started = Instant::now();
    let mut last_timestamp_us = None;
    let mut failure = None;
    let mut index = 0u64;

    while running.load(Ordering::SeqCst) && (args.frames == 0 || index < args.frames) {
        let dimensions = dimensions_at(base, index, args.resize_every);
        let pts = (!args.no_pts).then_some(index as i64);
        let frame = pattern
            .render(dimensions, index, pts)
            .map_err(|err| frame_error("render failed", err))?;

        if let Err(err) = sink.push(&frame) {
            warn!(frame = index, %err, "push failed, stopping stream");
            failure = Some(err);
            break;
        }
        last_timestamp_us = sink.encoder().map(|enc| enc.timestamp_micros(pts));
        index += 1;

        if args.realtime {
            let due = started + frame_interval * u32::try_from(index).unwrap_or(u32::MAX);
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        }
    }

    let summary = StreamSummary {
        path: args.path.display().to_string(),
        frames: sink.encoder().map_or(0, |enc| enc.frames_written()),
        bytes: sink.encoder().map_or(0, |enc| enc.bytes_written()),
        last_timestamp_us,
        stopped: sink.is_stopped(),
    };
    sink.close();
    info!(frames = summary.frames, "stream finished");
    print_summary(&summary, format);

    match failure {
        Some(err) => Err(sink_error("push failed", err)),
        None => Ok(SUCCESS),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
