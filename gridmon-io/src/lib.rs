//! gridmon-io: File-backed collaborators for the monitor.
//!
//! This crate provides a memory-mapped capture replay source, snapshot
//! sinks that write PNG images or CSV tables, and JSON configuration
//! loading.
//!

pub mod capture;
pub mod config;
mod csv;
mod error;
pub mod render;
pub mod summary;
pub mod synthetic;

pub use capture::{scan_frames, CaptureFile, CaptureWriter, Frame, FrameScan, ReplaySource};
pub use config::{config_from_json, load_config};
pub use csv::{write_snapshot_csv, CsvSnapshotWriter};
pub use error::{Error, Result};
pub use render::{render_snapshot, Colormap, PngRenderer, MAX_SCALE};
pub use summary::{summarize, CaptureSummary};
pub use synthetic::{synthetic_message, SyntheticConfig};
