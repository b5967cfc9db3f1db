//! Monitor configuration.

use std::time::Duration;

use gridmon_core::GridDimensions;
use gridmon_wire::{RecordDecoder, RecordLayout};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for a [`crate::WindowController`].
///
/// Every field has a default, so a partial JSON document only needs to
/// name the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Detector grid extents.
    pub grid: GridDimensions,
    /// Hit record layout.
    pub layout: RecordLayout,
    /// Records each message should carry (`None` = whatever fits).
    pub records_per_message: Option<usize>,
    /// Messages per accumulation window.
    pub period: u32,
    /// Upper bound on a single poll, in milliseconds.
    pub poll_timeout_ms: u64,
    /// Largest message a source should hand over, in bytes.
    pub max_message_bytes: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            grid: GridDimensions::default(),
            layout: RecordLayout::default(),
            records_per_message: Some(80_000),
            period: 5,
            poll_timeout_ms: 50,
            max_message_bytes: 50 * 1024 * 1024,
        }
    }
}

impl MonitorConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the grid dimensions.
    #[must_use]
    pub fn with_grid(mut self, grid: GridDimensions) -> Self {
        self.grid = grid;
        self
    }

    /// Sets the record layout.
    #[must_use]
    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the expected records per message.
    #[must_use]
    pub fn with_records_per_message(mut self, records: Option<usize>) -> Self {
        self.records_per_message = records;
        self
    }

    /// Sets the window period in messages.
    #[must_use]
    pub fn with_period(mut self, period: u32) -> Self {
        self.period = period;
        self
    }

    /// Sets the poll timeout.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        self
    }

    /// Sets the maximum message size.
    #[must_use]
    pub fn with_max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// Poll timeout as a [`Duration`].
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Builds the record decoder this configuration describes.
    ///
    /// # Errors
    /// Returns an error if the record layout is invalid.
    pub fn decoder(&self) -> Result<RecordDecoder> {
        Ok(RecordDecoder::new(self.layout, self.records_per_message)?)
    }

    /// Checks the configuration for values the monitor cannot run with.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] naming the offending field, or a
    /// wire error for an invalid record layout.
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(Error::InvalidConfig("period must be at least 1".into()));
        }
        if self.poll_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "poll_timeout_ms must be at least 1".into(),
            ));
        }
        if self.records_per_message == Some(0) {
            return Err(Error::InvalidConfig(
                "records_per_message must be at least 1 (or null)".into(),
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(Error::InvalidConfig(
                "max_message_bytes must be at least 1".into(),
            ));
        }
        self.layout.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.grid.cell_count(), 8 * 48 * 16);
        assert_eq!(config.layout.stride, 12);
        assert_eq!(config.layout.index_offset, 4);
        assert_eq!(config.records_per_message, Some(80_000));
        assert_eq!(config.period, 5);
        assert_eq!(config.poll_timeout(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let grid = GridDimensions::new(2, 3, 4).unwrap();
        let config = MonitorConfig::new()
            .with_grid(grid)
            .with_period(2)
            .with_records_per_message(None)
            .with_poll_timeout(Duration::from_millis(10))
            .with_max_message_bytes(1024);

        assert_eq!(config.grid, grid);
        assert_eq!(config.period, 2);
        assert_eq!(config.records_per_message, None);
        assert_eq!(config.poll_timeout_ms, 10);
        assert_eq!(config.max_message_bytes, 1024);
    }

    #[test]
    fn test_validate_rejects() {
        assert!(MonitorConfig::new().with_period(0).validate().is_err());
        assert!(MonitorConfig::new()
            .with_records_per_message(Some(0))
            .validate()
            .is_err());
        assert!(MonitorConfig::new()
            .with_poll_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(MonitorConfig::new()
            .with_max_message_bytes(0)
            .validate()
            .is_err());

        let bad_layout = RecordLayout {
            stride: 4,
            index_offset: 4,
        };
        let err = MonitorConfig::new()
            .with_layout(bad_layout)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::WireError(_)));
    }

    #[test]
    fn test_partial_json() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{ "period": 3, "grid": {"x": 2, "y": 2, "z": 2} }"#).unwrap();
        assert_eq!(config.period, 3);
        assert_eq!(config.grid.cell_count(), 8);
        assert_eq!(config.records_per_message, Some(80_000));

        let config: MonitorConfig =
            serde_json::from_str(r#"{ "records_per_message": null }"#).unwrap();
        assert_eq!(config.records_per_message, None);
    }
}
