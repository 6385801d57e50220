use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::{Result, TransportError};
use crate::stream::{PipeRole, PipeStream};

/// Default permission mode for created FIFOs: owner and group read-write.
pub const DEFAULT_PIPE_MODE: u32 = 0o660;

/// Lifecycle manager for the sink's named pipe.
///
/// `open` recreates the FIFO and blocks until a reader attaches; `close`
/// drops the descriptor and removes the FIFO. Dropping the endpoint closes it.
pub struct PipeEndpoint {
    path: PathBuf,
    mode: u32,
    stream: Option<PipeStream>,
    created_inode: Option<(u64, u64)>,
}

impl PipeEndpoint {
    /// Create an endpoint for `path` using [`DEFAULT_PIPE_MODE`]. Nothing is
    /// touched on disk until [`open`](Self::open).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_mode(path, DEFAULT_PIPE_MODE)
    }

    /// Create an endpoint with an explicit FIFO permission mode.
    pub fn with_mode(path: impl AsRef<Path>, mode: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mode,
            stream: None,
            created_inode: None,
        }
    }

    /// Create the FIFO and open it for writing.
    ///
    /// Any non-directory object already at the path is removed first. The
    /// open blocks the calling thread until a reader opens the other end;
    /// no timeout is applied. On failure the endpoint is left closed and any
    /// FIFO this call created is removed.
    pub fn open(&mut self) -> Result<&mut PipeStream> {
        if self.stream.is_some() {
            return Err(TransportError::AlreadyOpen {
                path: self.path.clone(),
            });
        }

        self.create().inspect_err(|err| {
            error!(path = ?self.path, %err, "failed to create fifo");
        })?;

        info!(path = ?self.path, "created fifo, waiting for reader");

        let file = match OpenOptions::new().write(true).open(&self.path) {
            Ok(file) => file,
            Err(source) => {
                error!(path = ?self.path, %source, "failed to open fifo");
                self.remove_created();
                return Err(TransportError::OpenFailed {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        info!(path = ?self.path, "reader connected");
        Ok(self
            .stream
            .insert(PipeStream::from_file(file, PipeRole::Writer)))
    }

    /// Close the descriptor (if open) and remove the FIFO from the filesystem.
    ///
    /// Idempotent: closing an endpoint that was never opened, or closing
    /// twice, is a no-op. Once this endpoint has created a FIFO, only that
    /// FIFO (same device and inode) is removed; a pipe another session has
    /// since created at the path is left in place.
    pub fn close(&mut self) {
        let was_open = self.stream.take().is_some();
        self.remove_fifo();

        if was_open {
            info!(path = ?self.path, "fifo closed");
        }
    }

    /// Whether a reader is currently attached.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// The open writer stream, if any.
    pub fn stream_mut(&mut self) -> Option<&mut PipeStream> {
        self.stream.as_mut()
    }

    /// The filesystem path of the FIFO.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Permission mode applied to created FIFOs.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "named-pipe"
    }

    fn create(&mut self) -> Result<()> {
        let create_failed = |path: &Path, source| TransportError::CreateFailed {
            path: path.to_path_buf(),
            source,
        };

        remove_stale(&self.path).map_err(|e| create_failed(&self.path, e))?;
        make_fifo(&self.path, self.mode).map_err(|e| create_failed(&self.path, e))?;

        // mkfifo honours the umask; pin the mode explicitly.
        let metadata = std::fs::set_permissions(
            &self.path,
            std::fs::Permissions::from_mode(self.mode),
        )
        .and_then(|()| std::fs::symlink_metadata(&self.path));
        match metadata {
            Ok(metadata) => {
                self.created_inode = Some((metadata.dev(), metadata.ino()));
                Ok(())
            }
            Err(e) => {
                let _ = std::fs::remove_file(&self.path);
                Err(create_failed(&self.path, e))
            }
        }
    }

    /// Remove the FIFO created by a failed `open`.
    fn remove_created(&self) {
        if self.created_inode.is_some() {
            self.remove_fifo();
        }
    }

    /// Remove the FIFO at the path if it is ours: the one recorded at
    /// creation, or any FIFO when this endpoint never created one.
    fn remove_fifo(&self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if !metadata.file_type().is_fifo() {
            return;
        }
        if let Some((expected_dev, expected_ino)) = self.created_inode {
            if metadata.dev() != expected_dev || metadata.ino() != expected_ino {
                debug!(path = ?self.path, "fifo path identity changed; skipping cleanup");
                return;
            }
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            debug!(path = ?self.path, %err, "failed to remove fifo");
        }
    }
}

impl Drop for PipeEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PipeEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeEndpoint")
            .field("path", &self.path)
            .field("mode", &format_args!("{:#o}", self.mode))
            .field("open", &self.stream.is_some())
            .finish()
    }
}

fn remove_stale(path: &Path) -> std::io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "existing path is a directory",
        )),
        Ok(_) => {
            debug!(?path, "removing stale object at fifo path");
            std::fs::remove_file(path)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn make_fifo(path: &Path, mode: u32) -> std::io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "fifo path contains a NUL byte",
        )
    })?;

    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
