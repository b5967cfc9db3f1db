//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Configuration file could not be parsed.
    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] gridmon_core::Error),

    /// Monitor error.
    #[error("monitor error: {0}")]
    MonitorError(#[from] gridmon_monitor::Error),

    /// Wire format error.
    #[error("wire error: {0}")]
    WireError(#[from] gridmon_wire::Error),
}

impl From<Error> for gridmon_monitor::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::MonitorError(inner) => inner,
            other => gridmon_monitor::Error::Sink(other.to_string()),
        }
    }
}
