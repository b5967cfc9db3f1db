//! Detector grid geometry.
//!
//! Pixels on the detector are addressed by a 1-based linear index that
//! runs fastest along `z`, then `y`, then `x`:
//!
//! ```text
//! index = x * Y * Z + y * Z + z + 1
//! ```

use std::fmt;

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Extents of the detector grid along its three axes.
///
/// Fixed at construction. The cell count always fits a [`PixelIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "Extents", into = "Extents")
)]
pub struct GridDimensions {
    x: usize,
    y: usize,
    z: usize,
}

/// Unvalidated extents used for (de)serialization.
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct Extents {
    x: usize,
    y: usize,
    z: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<Extents> for GridDimensions {
    type Error = Error;

    fn try_from(raw: Extents) -> Result<Self> {
        Self::new(raw.x, raw.y, raw.z)
    }
}

#[cfg(feature = "serde")]
impl From<GridDimensions> for Extents {
    fn from(dims: GridDimensions) -> Self {
        Self {
            x: dims.x,
            y: dims.y,
            z: dims.z,
        }
    }
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self::multigrid_defaults()
    }
}

impl GridDimensions {
    /// Creates grid dimensions.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] if an extent is zero or the
    /// total cell count does not fit a `u32` pixel index.
    pub fn new(x: usize, y: usize, z: usize) -> Result<Self> {
        if x == 0 || y == 0 || z == 0 {
            return Err(Error::InvalidDimensions(format!(
                "extents must be non-zero, got {x}x{y}x{z}"
            )));
        }

        let cells = x
            .checked_mul(y)
            .and_then(|xy| xy.checked_mul(z))
            .filter(|&cells| u32::try_from(cells).is_ok());
        if cells.is_none() {
            return Err(Error::InvalidDimensions(format!(
                "{x}x{y}x{z} cells cannot be addressed by a 32-bit pixel index"
            )));
        }

        Ok(Self { x, y, z })
    }

    /// The 8 x 48 x 16 multi-grid demonstrator layout.
    #[must_use]
    pub const fn multigrid_defaults() -> Self {
        Self { x: 8, y: 48, z: 16 }
    }

    /// Extent along x.
    #[must_use]
    #[inline]
    pub fn x(&self) -> usize {
        self.x
    }

    /// Extent along y.
    #[must_use]
    #[inline]
    pub fn y(&self) -> usize {
        self.y
    }

    /// Extent along z.
    #[must_use]
    #[inline]
    pub fn z(&self) -> usize {
        self.z
    }

    /// Total number of cells, which is also the largest valid pixel index.
    #[must_use]
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.x * self.y * self.z
    }

    /// Largest valid pixel index.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_index(&self) -> PixelIndex {
        // Bounded by the check in `new`.
        PixelIndex(self.cell_count() as u32)
    }

    /// Returns true if the coordinate lies inside the grid.
    #[must_use]
    #[inline]
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.x < self.x && coord.y < self.y && coord.z < self.z
    }

    /// See [`coordinate`].
    ///
    /// # Errors
    /// Returns [`Error::OutOfRangeIndex`] for an index outside the grid.
    #[inline]
    pub fn coordinate(&self, index: PixelIndex) -> Result<Coordinate> {
        coordinate(index, self)
    }

    /// See [`linearize`].
    ///
    /// # Errors
    /// Returns [`Error::CoordinateOutOfBounds`] for a coordinate outside the grid.
    #[inline]
    pub fn linearize(&self, coord: Coordinate) -> Result<PixelIndex> {
        linearize(coord, self)
    }
}

impl fmt::Display for GridDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// 1-based linear address of a detector cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelIndex(pub u32);

impl PixelIndex {
    /// Creates a pixel index.
    #[inline]
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u16> for PixelIndex {
    fn from(raw: u16) -> Self {
        Self(u32::from(raw))
    }
}

impl fmt::Display for PixelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a cell on the detector grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Coordinate {
    /// Creates a coordinate.
    #[inline]
    #[must_use]
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }
}

/// Maps a 1-based pixel index onto the grid.
///
/// # Errors
/// Returns [`Error::OutOfRangeIndex`] if `index` is 0 or larger than
/// [`GridDimensions::cell_count`].
pub fn coordinate(index: PixelIndex, dims: &GridDimensions) -> Result<Coordinate> {
    let max = dims.max_index();
    if index.0 == 0 || index > max {
        return Err(Error::OutOfRangeIndex {
            index: index.0,
            max: max.0,
        });
    }

    let offset = index.0 as usize - 1;
    Ok(Coordinate {
        x: offset / (dims.y * dims.z),
        y: (offset / dims.z) % dims.y,
        z: offset % dims.z,
    })
}

/// Maps a grid coordinate back to its 1-based pixel index.
///
/// # Errors
/// Returns [`Error::CoordinateOutOfBounds`] if the coordinate is outside
/// the grid.
pub fn linearize(coord: Coordinate, dims: &GridDimensions) -> Result<PixelIndex> {
    if !dims.contains(coord) {
        return Err(out_of_bounds(coord, dims));
    }

    let offset = coord.x * dims.y * dims.z + coord.y * dims.z + coord.z;
    u32::try_from(offset + 1)
        .map(PixelIndex)
        .map_err(|_| out_of_bounds(coord, dims))
}

pub(crate) fn out_of_bounds(coord: Coordinate, dims: &GridDimensions) -> Error {
    Error::CoordinateOutOfBounds {
        x: coord.x,
        y: coord.y,
        z: coord.z,
        dims: dims.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_last_index() {
        let dims = GridDimensions::default();
        assert_eq!(
            coordinate(PixelIndex(1), &dims).unwrap(),
            Coordinate::new(0, 0, 0)
        );
        assert_eq!(
            coordinate(PixelIndex(6_144), &dims).unwrap(),
            Coordinate::new(7, 47, 15)
        );
        assert_eq!(
            linearize(Coordinate::new(7, 47, 15), &dims).unwrap(),
            PixelIndex(6_144)
        );
        // Twice the cell count is well past the last cell.
        assert_eq!(
            coordinate(PixelIndex(12_288), &dims),
            Err(Error::OutOfRangeIndex {
                index: 12_288,
                max: 6_144
            })
        );
    }

    #[test]
    fn test_round_trip_every_index() {
        let dims = GridDimensions::default();
        for raw in 1..=dims.max_index().0 {
            let index = PixelIndex(raw);
            let coord = dims.coordinate(index).unwrap();
            assert!(dims.contains(coord));
            assert_eq!(dims.linearize(coord).unwrap(), index);
        }
    }

    #[test]
    fn test_round_trip_odd_dimensions() {
        let dims = GridDimensions::new(3, 5, 7).unwrap();
        for raw in 1..=dims.max_index().0 {
            let coord = dims.coordinate(PixelIndex(raw)).unwrap();
            assert_eq!(dims.linearize(coord).unwrap().0, raw);
        }
    }

    #[test]
    fn test_z_runs_fastest() {
        let dims = GridDimensions::default();
        assert_eq!(dims.coordinate(PixelIndex(2)).unwrap(), Coordinate::new(0, 0, 1));
        assert_eq!(dims.coordinate(PixelIndex(17)).unwrap(), Coordinate::new(0, 1, 0));
        // First cell of the second x layer: 48 * 16 + 1
        assert_eq!(dims.coordinate(PixelIndex(769)).unwrap(), Coordinate::new(1, 0, 0));
    }

    #[test]
    fn test_index_from_record_bytes() {
        // offset4 = 0x00, offset5 = 0x01
        let index = PixelIndex::from(u16::from_le_bytes([0x00, 0x01]));
        assert_eq!(index.0, 256);

        let dims = GridDimensions::default();
        let coord = dims.coordinate(index).unwrap();
        assert_eq!(coord, Coordinate::new(0, 15, 15));
        assert_eq!(dims.linearize(coord).unwrap(), index);
    }

    #[test]
    fn test_out_of_range_index() {
        let dims = GridDimensions::default();
        assert_eq!(
            dims.coordinate(PixelIndex(0)),
            Err(Error::OutOfRangeIndex {
                index: 0,
                max: 6_144
            })
        );
        assert!(matches!(
            dims.coordinate(PixelIndex(6_145)),
            Err(Error::OutOfRangeIndex { index: 6_145, .. })
        ));
        assert!(dims.coordinate(PixelIndex(u32::from(u16::MAX))).is_err());
    }

    #[test]
    fn test_linearize_rejects_outside_coordinate() {
        let dims = GridDimensions::default();
        assert!(matches!(
            dims.linearize(Coordinate::new(8, 0, 0)),
            Err(Error::CoordinateOutOfBounds { x: 8, .. })
        ));
        assert!(dims.linearize(Coordinate::new(0, 48, 0)).is_err());
        assert!(dims.linearize(Coordinate::new(0, 0, 16)).is_err());
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(GridDimensions::new(0, 48, 16).is_err());
        assert!(GridDimensions::new(8, 0, 16).is_err());
        assert!(GridDimensions::new(8, 48, 0).is_err());
        assert!(GridDimensions::new(1 << 16, 1 << 16, 2).is_err());
        assert!(GridDimensions::new(usize::MAX, 2, 2).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(GridDimensions::default().to_string(), "8x48x16");
        assert_eq!(GridDimensions::default().cell_count(), 6_144);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_validates() {
        let dims: GridDimensions = serde_json::from_str(r#"{"x": 4, "y": 6, "z": 2}"#).unwrap();
        assert_eq!(dims.cell_count(), 48);

        let bad = serde_json::from_str::<GridDimensions>(r#"{"x": 0, "y": 6, "z": 2}"#);
        assert!(bad.is_err());
    }
}
