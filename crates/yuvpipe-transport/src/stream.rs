use std::fs::File;
use std::io::{IoSlice, Read, Write};
use std::path::Path;

use crate::error::{Result, TransportError};

/// Which end of the pipe a [`PipeStream`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeRole {
    /// The producing end (the sink).
    Writer,
    /// The consuming end (a downstream reader).
    Reader,
}

/// One open end of a named pipe. Implements `Read` and `Write`.
///
/// Writes go straight to the descriptor with no userspace buffering, so a
/// `write_vectored` call maps onto a single `writev(2)`.
pub struct PipeStream {
    file: File,
    role: PipeRole,
}

impl PipeStream {
    pub(crate) fn from_file(file: File, role: PipeRole) -> Self {
        Self { file, role }
    }

    /// Open an existing FIFO for reading.
    ///
    /// Blocks until a writer has the other end open, exactly like the
    /// writer side blocks on its reader.
    pub fn connect_reader(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TransportError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(?path, "opened fifo for reading");
        Ok(Self::from_file(file, PipeRole::Reader))
    }

    /// Which end of the pipe this stream holds.
    pub fn role(&self) -> PipeRole {
        self.role
    }

    /// Try to clone this stream (duplicates the file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let file = self.file.try_clone()?;
        Ok(Self::from_file(file, self.role))
    }
}

impl Read for PipeStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for PipeStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
        self.file.write_vectored(bufs)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for PipeStream {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.file.as_raw_fd()
    }
}

impl std::fmt::Debug for PipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeStream")
            .field("type", &"fifo")
            .field("role", &self.role)
            .finish()
    }
}
