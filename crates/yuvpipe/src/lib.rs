//! Stream decoded video frames to another process over a named pipe.
//!
//! yuvpipe writes planar YUV 4:2:0 frames, each prefixed with a microsecond
//! timestamp, into a FIFO. A 12-byte `"YUV4"` record announces the frame
//! size at the start of the stream and whenever it changes.
//!
//! # Crate Structure
//!
//! - [`transport`]: FIFO creation, blocking open and teardown
//! - [`frame`]: wire protocol, encoder, reader and the frame pipe sink

/// Re-export transport types.
pub mod transport {
    pub use yuvpipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use yuvpipe_frame::*;
}
