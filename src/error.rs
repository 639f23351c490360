use core::fmt;
use std::path::PathBuf;

/// Result alias for `seep`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the engine and the propagation pipeline.
#[derive(Debug)]
pub enum Error {
    /// Input graph has no vertices.
    EmptyInput,

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// On-disk graph data is missing or malformed.
    GraphFormat {
        /// Location of the offending graph.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Underlying storage fault. Never retried; propagated as fatal.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::GraphFormat { path, message } => {
                write!(f, "malformed graph at {}: {message}", path.display())
            }
            Error::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
