use std::path::PathBuf;

/// Errors that can occur while managing the named pipe endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The FIFO special file could not be created.
    #[error("failed to create fifo {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The FIFO exists but opening it (and waiting for the peer) failed.
    #[error("failed to open fifo {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `open` was called on an endpoint that already has a connected reader.
    #[error("fifo {path} is already open")]
    AlreadyOpen { path: PathBuf },

    /// The endpoint has no open descriptor.
    #[error("fifo is not open")]
    NotOpen,

    /// An I/O error occurred on the pipe stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// The underlying OS error, if this error wraps one.
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            TransportError::CreateFailed { source, .. }
            | TransportError::OpenFailed { source, .. } => Some(source),
            TransportError::Io(err) => Some(err),
            TransportError::AlreadyOpen { .. } | TransportError::NotOpen => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
