//! Error types for gridmon-core.

use thiserror::Error;

/// Result type alias for gridmon-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Pixel index outside `[1, max]`.
    #[error("pixel index {index} outside valid range [1, {max}]")]
    OutOfRangeIndex { index: u32, max: u32 },

    /// Coordinate outside the detector grid.
    #[error("coordinate ({x}, {y}, {z}) outside grid {dims}")]
    CoordinateOutOfBounds {
        x: usize,
        y: usize,
        z: usize,
        dims: String,
    },

    /// Grid extents that cannot describe a detector.
    #[error("invalid grid dimensions: {0}")]
    InvalidDimensions(String),
}
