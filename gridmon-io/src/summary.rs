//! Whole-capture statistics.
//!
//! Frames are decoded independently in parallel; nothing here touches a
//! histogram.

use gridmon_monitor::MonitorConfig;
use gridmon_wire::PayloadDefect;
use rayon::prelude::*;
use serde::Serialize;

use crate::capture::{CaptureFile, Frame};
use crate::Result;

/// Totals over every frame of a capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    /// Complete frames.
    pub frames: u64,
    /// Payload bytes over all complete frames.
    pub payload_bytes: u64,
    /// Records decoded.
    pub records: u64,
    /// Records that map to a pixel of the grid.
    pub valid_hits: u64,
    /// Records whose pixel index is outside the grid.
    pub out_of_range: u64,
    /// Frames shorter than the expected payload.
    pub truncated: u64,
    /// Frames longer than the expected payload.
    pub overlong: u64,
    /// Frames larger than `max_message_bytes`; not decoded.
    pub oversized: u64,
    /// Bytes after the last complete frame.
    pub trailing_bytes: u64,
}

impl CaptureSummary {
    /// Pretty-printed JSON object with one field per counter.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Windows a full replay would emit, not counting a partial one.
    #[must_use]
    pub fn full_windows(&self, period: u32) -> u64 {
        let delivered = self.frames - self.oversized;
        delivered / u64::from(period.max(1))
    }

    fn merge(mut self, other: Self) -> Self {
        self.frames += other.frames;
        self.payload_bytes += other.payload_bytes;
        self.records += other.records;
        self.valid_hits += other.valid_hits;
        self.out_of_range += other.out_of_range;
        self.truncated += other.truncated;
        self.overlong += other.overlong;
        self.oversized += other.oversized;
        self
    }
}

/// Decodes every frame of `capture` under `config` and totals the results.
///
/// # Errors
/// Returns an error if the configuration is invalid.
pub fn summarize(capture: &CaptureFile, config: &MonitorConfig) -> Result<CaptureSummary> {
    config.validate()?;
    let decoder = config.decoder()?;
    let grid = config.grid;
    let data = capture.as_bytes();
    let scan = capture.scan();

    let summary = scan
        .frames
        .par_iter()
        .map(|frame: &Frame| {
            let mut stats = CaptureSummary {
                frames: 1,
                payload_bytes: frame.len as u64,
                ..CaptureSummary::default()
            };
            if frame.len > config.max_message_bytes {
                stats.oversized = 1;
                return stats;
            }

            let decoded = decoder.decode(frame.payload(data));
            match decoded.defect() {
                Some(PayloadDefect::Truncated { .. }) => stats.truncated = 1,
                Some(PayloadDefect::Overlong { .. }) => stats.overlong = 1,
                None => {}
            }
            for index in decoded.indices() {
                stats.records += 1;
                if grid.coordinate(index).is_ok() {
                    stats.valid_hits += 1;
                } else {
                    stats.out_of_range += 1;
                }
            }
            stats
        })
        .reduce(CaptureSummary::default, CaptureSummary::merge);

    Ok(CaptureSummary {
        trailing_bytes: scan.trailing_bytes as u64,
        ..summary
    })
}
