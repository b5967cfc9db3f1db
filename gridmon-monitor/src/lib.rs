//! gridmon-monitor: Windowed projection monitoring.
//!
//! This crate drives the ingestion loop:
//! - **[`WindowController`]** - decodes messages, accumulates projections,
//!   and hands a snapshot to the renderer every `period` messages
//! - **[`MessageSource`]** - bounded-wait message ingestion
//! - **[`SnapshotSink`]** - snapshot handoff to a renderer
//! - **[`CancelToken`]** - cooperative shutdown
//!
#![warn(missing_docs)]

mod cancel;
mod config;
mod controller;
mod error;
mod sink;
mod source;
mod statistics;

pub use cancel::CancelToken;
pub use config::MonitorConfig;
pub use controller::{MessageReport, RunSummary, Termination, WindowController, WindowState};
pub use error::{Error, Result};
pub use sink::{channel_sink, ChannelSink, SnapshotSink, WindowSnapshot};
pub use source::{channel_source, ChannelSource, MessageSource, Poll};
pub use statistics::MonitorStatistics;

// Re-export the types a monitor is configured with
pub use gridmon_core::{GridDimensions, ProjectionHistograms};
pub use gridmon_wire::{PayloadDefect, RecordLayout};
