//! Named pipe transport for yuvpipe.
//!
//! Owns the filesystem side of a streaming session:
//! - creating the FIFO special file with restrictive permissions
//! - blocking until a reader opens the other end
//! - removing the FIFO again when the session ends
//!
//! This is the lowest layer of yuvpipe. The frame crate writes its records
//! into the [`PipeStream`] handed out by [`PipeEndpoint`].

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod fifo;

pub use error::{Result, TransportError};
pub use stream::{PipeRole, PipeStream};

#[cfg(unix)]
pub use fifo::{PipeEndpoint, DEFAULT_PIPE_MODE};
