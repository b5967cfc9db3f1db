//! CSV snapshot writer.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gridmon_core::Projection;
use gridmon_monitor::{SnapshotSink, WindowSnapshot};
use log::debug;

use crate::Result;

/// Writes the non-zero cells of a snapshot as CSV.
///
/// Format: header `projection,row,col,count`, then one line per non-zero
/// cell in `xy`, `zy`, `xz` order, row-major within each projection.
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_snapshot_csv<W: Write>(writer: W, snapshot: &WindowSnapshot) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    writeln!(writer, "projection,row,col,count")?;

    for projection in Projection::ALL {
        let label = projection.label();
        for ((row, col), &count) in snapshot.histograms.get(projection).indexed_iter() {
            if count != 0 {
                writeln!(writer, "{label},{row},{col},{count}")?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// Writes each snapshot as `<prefix>_<window>.csv` into a directory.
pub struct CsvSnapshotWriter {
    dir: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl CsvSnapshotWriter {
    /// Creates a writer, creating the output directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: "projections".to_string(),
            written: Vec::new(),
        })
    }

    /// Sets the file name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Paths of the tables written so far.
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Writes one snapshot to its own file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write(&mut self, snapshot: &WindowSnapshot) -> Result<PathBuf> {
        let path = self
            .dir
            .join(format!("{}_{:06}.csv", self.prefix, snapshot.window));
        write_snapshot_csv(File::create(&path)?, snapshot)?;
        debug!("wrote {}", path.display());
        self.written.push(path.clone());
        Ok(path)
    }
}

impl SnapshotSink for CsvSnapshotWriter {
    fn publish(&mut self, snapshot: WindowSnapshot) -> gridmon_monitor::Result<()> {
        self.write(&snapshot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmon_core::{Coordinate, GridDimensions, ProjectionAccumulator};
    use tempfile::{tempdir, NamedTempFile};

    fn snapshot() -> WindowSnapshot {
        let mut acc = ProjectionAccumulator::new(GridDimensions::default());
        acc.add(Coordinate::new(1, 2, 3)).unwrap();
        acc.add(Coordinate::new(1, 2, 3)).unwrap();
        WindowSnapshot {
            window: 7,
            messages: 5,
            hits: acc.hits(),
            dropped: 0,
            partial: false,
            histograms: acc.snapshot(),
        }
    }

    #[test]
    fn test_write_snapshot_csv() {
        let file = NamedTempFile::new().unwrap();
        write_snapshot_csv(file.reopen().unwrap(), &snapshot()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "projection,row,col,count",
                "xy,2,1,2",
                "zy,2,3,2",
                // z reversed: 16 - 3 - 1
                "xz,12,1,2",
            ]
        );
    }

    #[test]
    fn test_empty_snapshot_has_header_only() {
        let mut empty = snapshot();
        empty.histograms = gridmon_core::ProjectionHistograms::zeros(GridDimensions::default());

        let mut buf = Vec::new();
        write_snapshot_csv(&mut buf, &empty).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "projection,row,col,count\n");
    }

    #[test]
    fn test_writer_names_files_by_window() {
        let dir = tempdir().unwrap();
        let mut writer = CsvSnapshotWriter::new(dir.path())
            .unwrap()
            .with_prefix("mg");
        writer.publish(snapshot()).unwrap();

        let expected = dir.path().join("mg_000007.csv");
        assert_eq!(writer.written(), &[expected.clone()]);
        assert!(std::fs::read_to_string(expected)
            .unwrap()
            .starts_with("projection,row,col,count"));
    }
}
