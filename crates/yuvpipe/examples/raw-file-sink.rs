//! Stream a raw yuv420p file into a FIFO, one frame per chunk.
//!
//! Run with:
//!   cargo run --example raw-file-sink -- input.yuv 320 240 25
//!
//! In another terminal:
//!   cargo run --features cli -- read /tmp/yuvpipe-raw-example.fifo --wait 10s

use std::fs::File;
use std::io::Read;

use yuvpipe::frame::{Dimensions, FramePipeSink, FrameSink, StreamParams, TimeBase, VideoFrame};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 {
        eprintln!("usage: raw-file-sink <input.yuv> <width> <height> <fps>");
        std::process::exit(64);
    }
    let width: u32 = args[2].parse()?;
    let height: u32 = args[3].parse()?;
    let fps: i32 = args[4].parse()?;

    let mut input = File::open(&args[1])?;
    let mut buf = vec![0u8; Dimensions::new(width, height).frame_size()];

    let fifo_path = std::env::temp_dir().join("yuvpipe-raw-example.fifo");
    let mut sink = FramePipeSink::new(&fifo_path);
    eprintln!("Waiting for a reader on {}", fifo_path.display());
    sink.open(&StreamParams::new(TimeBase::new(1, fps)?))?;

    let mut pts = 0i64;
    loop {
        if let Err(e) = input.read_exact(&mut buf) {
            eprintln!("End of input after {pts} frames: {e}");
            break;
        }
        let frame = VideoFrame::from_packed(width, height, &buf, Some(pts))?;
        if let Err(e) = sink.push(&frame) {
            eprintln!("Stopped: {e}");
            break;
        }
        pts += 1;
    }

    sink.close();
    Ok(())
}
