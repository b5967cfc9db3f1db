//! Wire-format error types.

use thiserror::Error;

/// Result type for wire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Length problems found in a message payload.
///
/// These are conditions, not failures: the decoder still yields every
/// whole record that fits the expectation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadDefect {
    /// Payload is shorter than expected, or ends in a partial record.
    #[error(
        "truncated payload: {actual_bytes} bytes ({records} whole records), expected {expected_bytes} bytes"
    )]
    Truncated {
        /// Bytes the configured record count requires.
        expected_bytes: usize,
        /// Bytes received.
        actual_bytes: usize,
        /// Whole records that will be decoded.
        records: usize,
    },

    /// Payload holds more whole records than expected.
    #[error(
        "overlong payload: {actual_bytes} bytes, expected {expected_bytes} bytes ({ignored} trailing records ignored)"
    )]
    Overlong {
        /// Bytes the configured record count requires.
        expected_bytes: usize,
        /// Bytes received.
        actual_bytes: usize,
        /// Whole records past the expectation.
        ignored: usize,
    },
}

/// Wire-format error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Record layout that cannot hold its pixel field.
    #[error("invalid record layout: {0}")]
    InvalidLayout(String),

    /// Payload length problem.
    #[error(transparent)]
    Payload(#[from] PayloadDefect),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] gridmon_core::Error),
}
