use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("yuvpipe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: yuvpipe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("YUVPIPE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "wire: \"{}\" dimension record ({} bytes), {}-byte timestamp, yuv420p payload",
        String::from_utf8_lossy(&yuvpipe_frame::DIMENSION_TAG),
        yuvpipe_frame::DIMENSION_RECORD_SIZE,
        yuvpipe_frame::TIMESTAMP_SIZE
    );
    println!("fifo_mode: {:#o}", yuvpipe_transport::DEFAULT_PIPE_MODE);

    Ok(SUCCESS)
}
