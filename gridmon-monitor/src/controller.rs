//! Windowed accumulation loop.

use std::time::{Duration, Instant};

use gridmon_core::{PixelIndex, ProjectionAccumulator};
use gridmon_wire::{PayloadDefect, RecordDecoder};
use log::{debug, info, warn};

use crate::{
    CancelToken, MessageSource, MonitorConfig, MonitorStatistics, Poll, Result, SnapshotSink,
    WindowSnapshot,
};

/// Phase of the window cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Adding decoded hits to the current window.
    Accumulating,
    /// Handing the finished window to the sink. Left before control
    /// returns to the caller.
    Emitting,
}

/// Why [`WindowController::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The cancel token was set.
    Cancelled,
    /// The source reported it is exhausted.
    SourceClosed,
}

/// Outcome of a [`WindowController::run`] call.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Terminal state of the loop.
    pub termination: Termination,
    /// Counters at the time the loop stopped.
    pub statistics: MonitorStatistics,
    /// Wall-clock time spent in the loop.
    pub elapsed: Duration,
}

/// What happened to a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReport {
    /// Records decoded from the payload.
    pub records: usize,
    /// Hits added to the projections.
    pub accumulated: usize,
    /// Out-of-range pixel indices dropped.
    pub dropped: usize,
    /// Length mismatch found by the decoder.
    pub defect: Option<PayloadDefect>,
    /// True if this message closed a window.
    pub emitted: bool,
}

/// Drives decoding, accumulation and the window cycle.
///
/// Owns the only [`ProjectionAccumulator`]; every mutation goes through
/// `&mut self`, so whoever drives the controller is the single writer.
///
/// Out-of-range pixel indices are dropped and counted. They never abort
/// a message, a window, or the loop.
pub struct WindowController {
    config: MonitorConfig,
    decoder: RecordDecoder,
    accumulator: ProjectionAccumulator,
    state: WindowState,
    countdown: u32,
    window: u64,
    window_messages: u32,
    window_dropped: u64,
    stats: MonitorStatistics,
}

impl WindowController {
    /// Creates a controller in the `Accumulating` state.
    ///
    /// # Errors
    /// Returns an error if the configuration fails validation.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let decoder = config.decoder()?;
        Ok(Self {
            decoder,
            accumulator: ProjectionAccumulator::new(config.grid),
            state: WindowState::Accumulating,
            countdown: config.period,
            window: 0,
            window_messages: 0,
            window_dropped: 0,
            stats: MonitorStatistics::default(),
            config,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Messages left before the current window closes.
    #[must_use]
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Sequence number of the window being accumulated.
    #[must_use]
    pub fn window(&self) -> u64 {
        self.window
    }

    /// Lifetime counters.
    #[must_use]
    pub fn statistics(&self) -> MonitorStatistics {
        self.stats
    }

    /// Read-only view of the current window's projections.
    #[must_use]
    pub fn accumulator(&self) -> &ProjectionAccumulator {
        &self.accumulator
    }

    /// Runs the ingestion loop until cancelled or the source closes.
    ///
    /// The cancel token is checked once per iteration, before polling, so
    /// a message is either processed completely or not consumed at all.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K, cancel: &CancelToken) -> RunSummary
    where
        S: MessageSource + ?Sized,
        K: SnapshotSink + ?Sized,
    {
        let start = Instant::now();
        let timeout = self.config.poll_timeout();
        info!(
            "monitor started: grid {}, period {} messages, {} records/message",
            self.config.grid,
            self.config.period,
            self.config
                .records_per_message
                .map_or_else(|| "any".to_string(), |n| n.to_string()),
        );

        let termination = loop {
            if cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            match source.poll(timeout) {
                Poll::Message(payload) => {
                    self.process_message(&payload, sink);
                }
                Poll::Empty => self.stats.empty_polls += 1,
                Poll::Closed => break Termination::SourceClosed,
            }
        };

        let elapsed = start.elapsed();
        info!(
            "monitor stopped ({:?}) after {:.2}s: {} messages, {} hits, {} snapshots, {} dropped",
            termination,
            elapsed.as_secs_f64(),
            self.stats.messages,
            self.stats.hits,
            self.stats.snapshots,
            self.stats.dropped_out_of_range,
        );

        RunSummary {
            termination,
            statistics: self.stats,
            elapsed,
        }
    }

    /// Decodes one message into the current window.
    ///
    /// Closes the window, and hands its snapshot to `sink`, when this
    /// message completes the period.
    pub fn process_message<K>(&mut self, payload: &[u8], sink: &mut K) -> MessageReport
    where
        K: SnapshotSink + ?Sized,
    {
        let decoded = self.decoder.decode(payload);
        let defect = decoded.defect().cloned();
        match &defect {
            Some(d @ PayloadDefect::Truncated { .. }) => {
                warn!("message {}: {d}", self.stats.messages);
                self.stats.truncated_payloads += 1;
            }
            Some(d @ PayloadDefect::Overlong { .. }) => {
                warn!("message {}: {d}", self.stats.messages);
                self.stats.overlong_payloads += 1;
            }
            None => {}
        }

        let mut accumulated = 0usize;
        let mut dropped = 0usize;
        let mut first_dropped: Option<PixelIndex> = None;
        for index in decoded.indices() {
            if self.accumulator.add_index(index).is_ok() {
                accumulated += 1;
            } else {
                dropped += 1;
                first_dropped.get_or_insert(index);
            }
        }

        if let Some(index) = first_dropped {
            warn!(
                "message {}: dropped {dropped} out-of-range pixel indices (first {index}, valid 1..={})",
                self.stats.messages,
                self.config.grid.max_index(),
            );
        }
        debug!(
            "message {}: {} records, {accumulated} hits, window {} countdown {}",
            self.stats.messages,
            decoded.records(),
            self.window,
            self.countdown - 1,
        );

        self.stats.messages += 1;
        self.stats.records += decoded.records() as u64;
        self.stats.hits += accumulated as u64;
        self.stats.dropped_out_of_range += dropped as u64;
        self.window_messages += 1;
        self.window_dropped += dropped as u64;

        self.countdown -= 1;
        let emitted = self.countdown == 0;
        if emitted {
            self.emit(sink, false);
        }

        MessageReport {
            records: decoded.records(),
            accumulated,
            dropped,
            defect,
            emitted,
        }
    }

    /// Emits the current window early if it holds any message.
    ///
    /// Returns true if a snapshot was emitted.
    pub fn flush<K>(&mut self, sink: &mut K) -> bool
    where
        K: SnapshotSink + ?Sized,
    {
        if self.window_messages == 0 {
            return false;
        }
        self.emit(sink, true);
        true
    }

    fn emit<K>(&mut self, sink: &mut K, partial: bool)
    where
        K: SnapshotSink + ?Sized,
    {
        self.state = WindowState::Emitting;

        let snapshot = WindowSnapshot {
            window: self.window,
            messages: self.window_messages,
            hits: self.accumulator.hits(),
            dropped: self.window_dropped,
            partial,
            histograms: self.accumulator.snapshot(),
        };
        let hits = snapshot.hits;

        match sink.publish(snapshot) {
            Ok(()) => info!(
                "window {}: {} messages, {hits} hits{}",
                self.window,
                self.window_messages,
                if partial { " (partial)" } else { "" },
            ),
            Err(e) => {
                warn!("window {}: snapshot not delivered: {e}", self.window);
                self.stats.sink_failures += 1;
            }
        }
        self.stats.snapshots += 1;

        self.accumulator.clear();
        self.countdown = self.config.period;
        self.window += 1;
        self.window_messages = 0;
        self.window_dropped = 0;
        self.state = WindowState::Accumulating;
    }
}
