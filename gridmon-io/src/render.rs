//! PNG rendering of window snapshots.
//!
//! The three projections are drawn side by side (`xy | zy | xz`), each
//! cell as a `scale x scale` block. Each panel is normalised to its own
//! maximum with a square-root curve so sparse cells stay visible.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use gridmon_core::{Projection, ProjectionHistograms};
use gridmon_monitor::{SnapshotSink, WindowSnapshot};
use image::{Rgba, RgbaImage};
use log::debug;
use ndarray::Array2;

use crate::{Error, Result};

/// Colour of gaps between panels and of empty cells.
const BACKGROUND: Rgba<u8> = Rgba([24, 24, 24, 255]);

/// Panel gap in output pixels.
const PANEL_GAP: u32 = 4;

/// Largest accepted number of output pixels per histogram cell.
pub const MAX_SCALE: u32 = 256;

/// Largest image, in pixels, the renderer will allocate.
const MAX_IMAGE_PIXELS: u64 = 1 << 28;

/// Available colormaps for projection images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// Grayscale - black to white.
    Grayscale,
    /// Hot (Thermal) - red to yellow to white.
    Hot,
    /// Viridis (approximate) - blue to teal to green to yellow.
    #[default]
    Viridis,
    /// Green (Matrix style) - black to bright green.
    Green,
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Colormap::Grayscale => write!(f, "grayscale"),
            Colormap::Hot => write!(f, "hot"),
            Colormap::Viridis => write!(f, "viridis"),
            Colormap::Green => write!(f, "green"),
        }
    }
}

impl FromStr for Colormap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "grayscale" | "gray" | "grey" => Ok(Colormap::Grayscale),
            "hot" => Ok(Colormap::Hot),
            "viridis" => Ok(Colormap::Viridis),
            "green" => Ok(Colormap::Green),
            other => Err(Error::InvalidFormat(format!("unknown colormap '{other}'"))),
        }
    }
}

impl Colormap {
    /// Apply the colormap to a normalized value [0, 1] and return RGBA bytes.
    #[must_use]
    pub fn apply(self, val: f32) -> Rgba<u8> {
        let val = val.clamp(0.0, 1.0);
        match self {
            Colormap::Grayscale => {
                let v = to_u8(val * 255.0);
                Rgba([v, v, v, 255])
            }
            Colormap::Hot => {
                if val < 0.5 {
                    Rgba([255, to_u8(val * 2.0 * 255.0), 0, 255])
                } else {
                    Rgba([255, 255, to_u8((val - 0.5) * 2.0 * 255.0), 255])
                }
            }
            Colormap::Viridis => {
                let r = to_u8(255.0 * val.powi(2));
                let g = to_u8(255.0 * val);
                let b = to_u8(255.0 * (1.0 - val));
                Rgba([r, g, b, 255])
            }
            Colormap::Green => Rgba([0, to_u8(val * 255.0), 0, 255]),
        }
    }
}

/// Convert f32 to u8 with clamping to [0, 255].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f32) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}

/// Square-root normalisation of `count` against `max`.
#[allow(clippy::cast_precision_loss)]
fn normalize(count: u64, max: u64) -> f32 {
    if max == 0 {
        0.0
    } else {
        (count as f32 / max as f32).sqrt()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_u32(value: usize) -> u32 {
    value.min(u32::MAX as usize) as u32
}

fn checked_image_size(histograms: &ProjectionHistograms, scale: u32) -> Result<(u32, u32)> {
    if scale == 0 || scale > MAX_SCALE {
        return Err(Error::InvalidFormat(format!(
            "scale {scale} outside [1, {MAX_SCALE}]"
        )));
    }
    match image_size(histograms, scale) {
        Some((width, height)) if u64::from(width) * u64::from(height) <= MAX_IMAGE_PIXELS => {
            Ok((width, height))
        }
        _ => Err(Error::InvalidFormat(format!(
            "{} grid at scale {scale} exceeds the image size limit",
            histograms.dimensions()
        ))),
    }
}

/// Output image size `(width, height)` for a snapshot at `scale`.
///
/// Returns `None` if either side does not fit a `u32`.
#[must_use]
pub fn image_size(histograms: &ProjectionHistograms, scale: u32) -> Option<(u32, u32)> {
    let mut width = PANEL_GAP.checked_mul(2)?;
    let mut height = 0u32;
    for projection in Projection::ALL {
        let (rows, cols) = histograms.get(projection).dim();
        let cols = u32::try_from(cols).ok()?.checked_mul(scale)?;
        let rows = u32::try_from(rows).ok()?.checked_mul(scale)?;
        width = width.checked_add(cols)?;
        height = height.max(rows);
    }
    Some((width, height))
}

fn draw_panel(
    image: &mut RgbaImage,
    plane: &Array2<u64>,
    left: u32,
    scale: u32,
    colormap: Colormap,
) {
    let max = plane.iter().copied().max().unwrap_or(0);
    for ((row, col), &count) in plane.indexed_iter() {
        let colour = if count == 0 {
            BACKGROUND
        } else {
            colormap.apply(normalize(count, max))
        };
        let x0 = left + to_u32(col) * scale;
        let y0 = to_u32(row) * scale;
        for dy in 0..scale {
            for dx in 0..scale {
                image.put_pixel(x0 + dx, y0 + dy, colour);
            }
        }
    }
}

/// Draws the three projections of a snapshot into one image.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if `scale` is outside `[1, MAX_SCALE]`
/// or the image would exceed the size limit.
pub fn render_snapshot(
    histograms: &ProjectionHistograms,
    scale: u32,
    colormap: Colormap,
) -> Result<RgbaImage> {
    let (width, height) = checked_image_size(histograms, scale)?;
    let mut image = RgbaImage::from_pixel(width, height, BACKGROUND);

    let mut left = 0;
    for projection in Projection::ALL {
        let plane = histograms.get(projection);
        draw_panel(&mut image, plane, left, scale, colormap);
        left += to_u32(plane.ncols()) * scale + PANEL_GAP;
    }
    Ok(image)
}

/// Writes each snapshot as `<prefix>_<window>.png` into a directory.
pub struct PngRenderer {
    dir: PathBuf,
    prefix: String,
    scale: u32,
    colormap: Colormap,
    written: Vec<PathBuf>,
}

impl PngRenderer {
    /// Creates a renderer, creating the output directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: "projections".to_string(),
            scale: 8,
            colormap: Colormap::default(),
            written: Vec::new(),
        })
    }

    /// Sets the file name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the number of output pixels per histogram cell.
    ///
    /// Values outside `[1, MAX_SCALE]` are rejected when writing.
    #[must_use]
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the colormap.
    #[must_use]
    pub fn with_colormap(mut self, colormap: Colormap) -> Self {
        self.colormap = colormap;
        self
    }

    /// Paths of the images written so far.
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Output path for a window.
    #[must_use]
    pub fn path_for(&self, window: u64) -> PathBuf {
        self.dir.join(format!("{}_{window:06}.png", self.prefix))
    }

    /// Renders and saves one snapshot.
    ///
    /// # Errors
    /// Returns an error if the scale is out of range, or the image cannot
    /// be encoded or written.
    pub fn write(&mut self, snapshot: &WindowSnapshot) -> Result<PathBuf> {
        let image = render_snapshot(&snapshot.histograms, self.scale, self.colormap)?;
        let path = self.path_for(snapshot.window);
        image.save(&path)?;
        debug!("wrote {}", path.display());
        self.written.push(path.clone());
        Ok(path)
    }
}

impl SnapshotSink for PngRenderer {
    fn publish(&mut self, snapshot: WindowSnapshot) -> gridmon_monitor::Result<()> {
        self.write(&snapshot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gridmon_core::{Coordinate, GridDimensions, ProjectionAccumulator};
    use tempfile::tempdir;

    fn snapshot_with(coords: &[Coordinate]) -> WindowSnapshot {
        let mut acc = ProjectionAccumulator::new(GridDimensions::default());
        for &c in coords {
            acc.add(c).unwrap();
        }
        WindowSnapshot {
            window: 3,
            messages: 5,
            hits: acc.hits(),
            dropped: 0,
            partial: false,
            histograms: acc.snapshot(),
        }
    }

    #[test]
    fn test_normalize() {
        assert_relative_eq!(normalize(0, 0), 0.0);
        assert_relative_eq!(normalize(25, 100), 0.5);
        assert_relative_eq!(normalize(100, 100), 1.0);
    }

    #[test]
    fn test_colormap_endpoints() {
        assert_eq!(Colormap::Grayscale.apply(0.0), Rgba([0, 0, 0, 255]));
        assert_eq!(Colormap::Grayscale.apply(1.0), Rgba([255, 255, 255, 255]));
        assert_eq!(Colormap::Hot.apply(1.0), Rgba([255, 255, 255, 255]));
        assert_eq!(Colormap::Green.apply(2.0), Rgba([0, 255, 0, 255]));
        assert_eq!(Colormap::Viridis.apply(0.0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_colormap_parse() {
        assert_eq!("Hot".parse::<Colormap>().unwrap(), Colormap::Hot);
        assert_eq!("grey".parse::<Colormap>().unwrap(), Colormap::Grayscale);
        assert!("jet".parse::<Colormap>().is_err());
        assert_eq!(Colormap::Viridis.to_string(), "viridis");
    }

    #[test]
    fn test_image_size() {
        let snapshot = snapshot_with(&[]);
        // Widths 8 + 16 + 8 cells, tallest panel 48 rows.
        assert_eq!(image_size(&snapshot.histograms, 1), Some((32 + 8, 48)));
        assert_eq!(image_size(&snapshot.histograms, 4), Some((128 + 8, 192)));
    }

    #[test]
    fn test_image_size_overflow() {
        let histograms = ProjectionHistograms::zeros(GridDimensions::default());
        assert_eq!(image_size(&histograms, 200_000_000), None);
        assert_eq!(image_size(&histograms, u32::MAX), None);
    }

    #[test]
    fn test_render_rejects_bad_scale() {
        let histograms = ProjectionHistograms::zeros(GridDimensions::default());
        for scale in [0, MAX_SCALE + 1, 200_000_000] {
            assert!(matches!(
                render_snapshot(&histograms, scale, Colormap::Hot),
                Err(Error::InvalidFormat(_))
            ));
        }
        let tiny = ProjectionHistograms::zeros(GridDimensions::new(1, 1, 1).unwrap());
        let image = render_snapshot(&tiny, MAX_SCALE, Colormap::Hot).unwrap();
        assert_eq!(image.dimensions(), (3 * MAX_SCALE + 2 * PANEL_GAP, MAX_SCALE));
    }

    #[test]
    fn test_renderer_reports_bad_scale_as_sink_error() {
        let dir = tempdir().unwrap();
        let mut renderer = PngRenderer::new(dir.path())
            .unwrap()
            .with_scale(200_000_000);

        let err = renderer.publish(snapshot_with(&[])).unwrap_err();
        assert!(matches!(err, gridmon_monitor::Error::Sink(_)));
        assert!(renderer.written().is_empty());
    }

    #[test]
    fn test_render_places_hits() {
        let snapshot = snapshot_with(&[Coordinate::new(0, 0, 0)]);
        let image = render_snapshot(&snapshot.histograms, 2, Colormap::Grayscale).unwrap();
        let white = Rgba([255, 255, 255, 255]);

        // xy[0, 0]
        assert_eq!(*image.get_pixel(0, 0), white);
        assert_eq!(*image.get_pixel(1, 1), white);
        // zy[0, 0] starts after the 8-column xy panel and a gap.
        assert_eq!(*image.get_pixel(16 + PANEL_GAP, 0), white);
        // xz[15, 0]: z reversed, bottom-left of the third panel.
        let xz_left = 16 + PANEL_GAP + 32 + PANEL_GAP;
        assert_eq!(*image.get_pixel(xz_left, 30), white);
        // An empty cell keeps the background.
        assert_eq!(*image.get_pixel(2, 0), BACKGROUND);
    }

    #[test]
    fn test_renderer_writes_png() {
        let dir = tempdir().unwrap();
        let mut renderer = PngRenderer::new(dir.path().join("out"))
            .unwrap()
            .with_prefix("mg")
            .with_scale(3)
            .with_colormap(Colormap::Hot);

        let snapshot = snapshot_with(&[Coordinate::new(1, 2, 3)]);
        renderer.publish(snapshot).unwrap();

        let path = dir.path().join("out").join("mg_000003.png");
        assert_eq!(renderer.written(), &[path.clone()]);
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), (32 * 3) + PANEL_GAP * 2);
        assert_eq!(decoded.height(), 48 * 3);
    }
}
