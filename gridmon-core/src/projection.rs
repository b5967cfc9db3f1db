//! Projection histograms of the detector grid.
//!
//! Each hit is counted once in three 2D planes, each formed by summing
//! along one grid axis:
//!
//! | plane | rows | cols | cell incremented      |
//! |-------|------|------|-----------------------|
//! | `xy`  | Y    | X    | `[y, x]`              |
//! | `zy`  | Y    | Z    | `[y, z]`              |
//! | `xz`  | Z    | X    | `[Z - z - 1, x]`      |
//!
//! The x-z plane is stored with z reversed so that row 0 is the far side
//! of the detector, which matches how the grid is mounted.

use std::fmt;

use ndarray::Array2;

use crate::geometry::{out_of_bounds, Coordinate, GridDimensions, PixelIndex};
use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the three projection planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Projection {
    /// Summed over z: rows are y, columns are x.
    Xy,
    /// Summed over x: rows are y, columns are z.
    Zy,
    /// Summed over y: rows are reversed z, columns are x.
    Xz,
}

impl Projection {
    /// All planes in display order.
    pub const ALL: [Projection; 3] = [Projection::Xy, Projection::Zy, Projection::Xz];

    /// Shape `(rows, cols)` of this plane for the given grid.
    #[must_use]
    pub fn shape(self, dims: &GridDimensions) -> (usize, usize) {
        match self {
            Projection::Xy => (dims.y(), dims.x()),
            Projection::Zy => (dims.y(), dims.z()),
            Projection::Xz => (dims.z(), dims.x()),
        }
    }

    /// Short lowercase label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Projection::Xy => "xy",
            Projection::Zy => "zy",
            Projection::Xz => "xz",
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three projection planes of one accumulation window.
///
/// Values handed out by [`ProjectionAccumulator::snapshot`] own their
/// storage and are never touched by the accumulator again.
///
/// Serializable for export only; planes can only be built from a grid, so
/// their shapes always agree with `dims`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ProjectionHistograms {
    dims: GridDimensions,
    xy: Array2<u64>,
    zy: Array2<u64>,
    xz: Array2<u64>,
}

impl ProjectionHistograms {
    /// Creates all-zero planes for the given grid.
    #[must_use]
    pub fn zeros(dims: GridDimensions) -> Self {
        Self {
            dims,
            xy: Array2::zeros(Projection::Xy.shape(&dims)),
            zy: Array2::zeros(Projection::Zy.shape(&dims)),
            xz: Array2::zeros(Projection::Xz.shape(&dims)),
        }
    }

    /// Grid the planes were built for.
    #[must_use]
    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    /// The x-y plane (Y rows, X columns).
    #[must_use]
    pub fn xy(&self) -> &Array2<u64> {
        &self.xy
    }

    /// The z-y plane (Y rows, Z columns).
    #[must_use]
    pub fn zy(&self) -> &Array2<u64> {
        &self.zy
    }

    /// The x-z plane (Z rows with z reversed, X columns).
    #[must_use]
    pub fn xz(&self) -> &Array2<u64> {
        &self.xz
    }

    /// Returns the requested plane.
    #[must_use]
    pub fn get(&self, projection: Projection) -> &Array2<u64> {
        match projection {
            Projection::Xy => &self.xy,
            Projection::Zy => &self.zy,
            Projection::Xz => &self.xz,
        }
    }

    /// Number of hits counted. Every plane sums to this value.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.xy.sum()
    }

    /// Returns true if no hit has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.xy.iter().all(|&count| count == 0)
    }

    /// Largest single cell count across the three planes.
    #[must_use]
    pub fn max_count(&self) -> u64 {
        Projection::ALL
            .iter()
            .filter_map(|&p| self.get(p).iter().max().copied())
            .max()
            .unwrap_or(0)
    }

    fn fill_zero(&mut self) {
        self.xy.fill(0);
        self.zy.fill(0);
        self.xz.fill(0);
    }
}

/// Accumulates hits into the three projection planes.
///
/// Only `add`, `add_index` and `clear` mutate the planes, and all of them
/// take `&mut self`, so a single owner is the only writer.
#[derive(Debug, Clone)]
pub struct ProjectionAccumulator {
    histograms: ProjectionHistograms,
    hits: u64,
}

impl ProjectionAccumulator {
    /// Creates an accumulator with zeroed planes.
    #[must_use]
    pub fn new(dims: GridDimensions) -> Self {
        Self {
            histograms: ProjectionHistograms::zeros(dims),
            hits: 0,
        }
    }

    /// Grid the accumulator was built for.
    #[must_use]
    pub fn dimensions(&self) -> GridDimensions {
        self.histograms.dims
    }

    /// Hits accumulated since the last clear.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Counts one hit at `coord` in all three planes.
    ///
    /// # Errors
    /// Returns [`crate::Error::CoordinateOutOfBounds`] if the coordinate is
    /// outside the grid. The planes are left untouched in that case.
    pub fn add(&mut self, coord: Coordinate) -> Result<()> {
        let dims = self.histograms.dims;
        if !dims.contains(coord) {
            return Err(out_of_bounds(coord, &dims));
        }

        let Coordinate { x, y, z } = coord;
        self.histograms.xy[[y, x]] += 1;
        self.histograms.zy[[y, z]] += 1;
        self.histograms.xz[[dims.z() - z - 1, x]] += 1;
        self.hits += 1;
        Ok(())
    }

    /// Maps `index` onto the grid and counts it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfRangeIndex`] for an index outside the grid.
    pub fn add_index(&mut self, index: PixelIndex) -> Result<Coordinate> {
        let coord = self.histograms.dims.coordinate(index)?;
        self.add(coord)?;
        Ok(coord)
    }

    /// Resets every cell to zero, keeping the plane shapes.
    pub fn clear(&mut self) {
        self.histograms.fill_zero();
        self.hits = 0;
    }

    /// Returns an owned copy of the current planes.
    #[must_use]
    pub fn snapshot(&self) -> ProjectionHistograms {
        self.histograms.clone()
    }

    /// Borrows the current planes without copying.
    #[must_use]
    pub fn histograms(&self) -> &ProjectionHistograms {
        &self.histograms
    }
}
