//! Running counters for a monitor session.

/// Counters accumulated over the lifetime of a [`crate::WindowController`].
///
/// Unlike the histograms these are never reset at window boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStatistics {
    /// Messages processed.
    pub messages: u64,
    /// Records decoded across all messages.
    pub records: u64,
    /// Hits added to the projections.
    pub hits: u64,
    /// Pixel indices outside the grid, dropped.
    pub dropped_out_of_range: u64,
    /// Payloads shorter than expected or ending in a partial record.
    pub truncated_payloads: u64,
    /// Payloads carrying more records than expected.
    pub overlong_payloads: u64,
    /// Polls that returned no message.
    pub empty_polls: u64,
    /// Snapshots emitted.
    pub snapshots: u64,
    /// Snapshots the sink failed to take.
    pub sink_failures: u64,
}

impl MonitorStatistics {
    /// Clear all counters.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Fraction of decoded records that were dropped.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn drop_fraction(&self) -> Option<f64> {
        if self.records == 0 {
            None
        } else {
            Some(self.dropped_out_of_range as f64 / self.records as f64)
        }
    }

    /// Payloads whose length did not match the expectation.
    #[must_use]
    pub fn defective_payloads(&self) -> u64 {
        self.truncated_payloads + self.overlong_payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_fraction() {
        let mut stats = MonitorStatistics::default();
        assert_eq!(stats.drop_fraction(), None);

        stats.records = 200;
        stats.dropped_out_of_range = 50;
        assert_eq!(stats.drop_fraction(), Some(0.25));

        stats.clear();
        assert_eq!(stats, MonitorStatistics::default());
    }

    #[test]
    fn test_defective_payloads() {
        let stats = MonitorStatistics {
            truncated_payloads: 2,
            overlong_payloads: 3,
            ..MonitorStatistics::default()
        };
        assert_eq!(stats.defective_payloads(), 5);
    }
}
