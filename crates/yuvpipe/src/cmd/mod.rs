use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod read;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a FIFO and stream a synthetic test pattern into it.
    Stream(StreamArgs),
    /// Attach to a FIFO and print the records read from it.
    Read(ReadArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// FIFO path to create.
    pub path: PathBuf,
    /// Frame width in pixels.
    #[arg(long, default_value = "320", value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,
    /// Frame height in pixels.
    #[arg(long, default_value = "240", value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,
    /// Number of frames to send (0 streams until interrupted).
    #[arg(long, default_value = "100")]
    pub frames: u64,
    /// Frame rate; the stream time base is 1/fps.
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(i32).range(1..))]
    pub fps: i32,
    /// Extra bytes of stride padding per row (forces the buffered write path).
    #[arg(long, default_value = "0")]
    pub pad: usize,
    /// Halve the frame size every N frames, then restore it.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub resize_every: Option<u64>,
    /// Send frames without timestamps.
    #[arg(long)]
    pub no_pts: bool,
    /// Pace output at the frame rate instead of as fast as the reader drains.
    #[arg(long)]
    pub realtime: bool,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// FIFO path to attach to.
    pub path: PathBuf,
    /// Exit after reading N frames.
    #[arg(long)]
    pub count: Option<u64>,
    /// Wait up to this long for the FIFO to appear (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub wait: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
