//! Monitor error types.

use thiserror::Error;

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Monitor error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected by validation.
    #[error("invalid monitor configuration: {0}")]
    InvalidConfig(String),

    /// The snapshot receiver has gone away.
    #[error("snapshot sink closed")]
    SinkClosed,

    /// The snapshot sink failed to handle a snapshot.
    #[error("snapshot sink error: {0}")]
    Sink(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] gridmon_core::Error),

    /// Wire format error.
    #[error("wire error: {0}")]
    WireError(#[from] gridmon_wire::Error),
}
