//! Error types for mediadrain
//!
//! This module defines the error type shared by the audio and video paths.
//! Engine and display failures are translated into it exactly once, at the
//! drain/present boundary, and are never re-interpreted downstream.

use crate::engine::EngineError;
use crate::renderer::SurfaceError;
use thiserror::Error;

/// Main error type for mediadrain
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed bitstream; recoverable by discarding the packet
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The decoder's input queue is full and must be drained first
    #[error("Decoder is full, drain frames before sending more input")]
    NeedsDrainFirst,

    /// Display target missing or invalidated
    #[error("Surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// Allocation or buffer growth failure
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// No decoder registered under the requested name
    #[error("Codec not found: {0}")]
    CodecNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Unclassified engine failure
    #[error("Engine error: {0}")]
    Other(String),
}

/// Error taxonomy the calling layer programs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidData,
    NeedsDrainFirst,
    /// Not an error as such; listed so callers can match on one enum
    NeedMoreInput,
    SurfaceUnavailable,
    ResourceExhausted,
    Other,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidData(_) => ErrorKind::InvalidData,
            Error::NeedsDrainFirst => ErrorKind::NeedsDrainFirst,
            Error::SurfaceUnavailable(_) => ErrorKind::SurfaceUnavailable,
            Error::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Error::CodecNotFound(_) | Error::Config(_) | Error::FileIO(_) | Error::Other(_) => {
                ErrorKind::Other
            }
        }
    }

    /// Create an engine error from string
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidData(msg) => Error::InvalidData(msg),
            EngineError::OutOfMemory(msg) => Error::ResourceExhausted(msg),
            EngineError::Unsupported(msg) | EngineError::Failed(msg) => Error::Other(msg),
        }
    }
}

impl From<SurfaceError> for Error {
    fn from(err: SurfaceError) -> Self {
        Error::SurfaceUnavailable(err.to_string())
    }
}

/// Convenience type alias for Results in mediadrain
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for converting other errors to [`Error`]
pub trait ResultExt<T> {
    /// Convert this error into an [`Error`] with the given context
    fn invalid_data(self, context: &str) -> Result<T>;
    fn engine_err(self, context: &str) -> Result<T>;
    fn surface_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn invalid_data(self, context: &str) -> Result<T> {
        self.map_err(|e| Error::InvalidData(format!("{}: {}", context, e)))
    }

    fn engine_err(self, context: &str) -> Result<T> {
        self.map_err(|e| Error::Other(format!("{}: {}", context, e)))
    }

    fn surface_err(self, context: &str) -> Result<T> {
        self.map_err(|e| Error::SurfaceUnavailable(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| Error::Config(format!("{}: {}", context, e)))
    }
}

/// Helper macro for creating internal errors with file and line information
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::utils::error::Error::Other(
            format!("{} at {}:{}", $msg, file!(), line!())
        )
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::utils::error::Error::Other(
            format!("{} at {}:{}", format!($fmt, $($arg)*), file!(), line!())
        )
    };
}
