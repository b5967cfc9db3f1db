//! gridmon-core: Grid geometry and projection histograms.
//!
//! This crate provides the pieces of the monitor that carry real
//! invariants: mapping 1-based linear pixel indices onto a 3D detector
//! grid, and accumulating the three axis projections of that grid.
//!

pub mod error;
pub mod geometry;
pub mod projection;

pub use error::{Error, Result};
pub use geometry::{coordinate, linearize, Coordinate, GridDimensions, PixelIndex};
pub use projection::{Projection, ProjectionAccumulator, ProjectionHistograms};
