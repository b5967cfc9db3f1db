//! Snapshot handoff to a renderer.

use std::sync::mpsc::{channel, Receiver, Sender};

use gridmon_core::ProjectionHistograms;

use crate::{Error, Result};

/// The projections of one completed window.
///
/// A plain value: the renderer may keep it for as long as it likes while
/// the monitor accumulates the next window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Window sequence number, starting at 0.
    pub window: u64,
    /// Messages processed in this window.
    pub messages: u32,
    /// Hits counted in this window.
    pub hits: u64,
    /// Out-of-range pixel indices dropped in this window.
    pub dropped: u64,
    /// True if the window was flushed before reaching its period.
    pub partial: bool,
    /// The three projection planes.
    pub histograms: ProjectionHistograms,
}

/// Receives a snapshot at every window boundary.
pub trait SnapshotSink {
    /// Takes ownership of a snapshot.
    ///
    /// # Errors
    /// Implementations report their own failures; the monitor logs them
    /// and carries on with the next window.
    fn publish(&mut self, snapshot: WindowSnapshot) -> Result<()>;
}

impl<K: SnapshotSink + ?Sized> SnapshotSink for Box<K> {
    fn publish(&mut self, snapshot: WindowSnapshot) -> Result<()> {
        (**self).publish(snapshot)
    }
}

/// Collects snapshots in memory.
impl SnapshotSink for Vec<WindowSnapshot> {
    fn publish(&mut self, snapshot: WindowSnapshot) -> Result<()> {
        self.push(snapshot);
        Ok(())
    }
}

/// Forwards snapshots to a renderer thread.
pub struct ChannelSink {
    tx: Sender<WindowSnapshot>,
}

impl ChannelSink {
    /// Wraps an existing sender.
    #[must_use]
    pub fn new(tx: Sender<WindowSnapshot>) -> Self {
        Self { tx }
    }
}

impl SnapshotSink for ChannelSink {
    fn publish(&mut self, snapshot: WindowSnapshot) -> Result<()> {
        self.tx.send(snapshot).map_err(|_| Error::SinkClosed)
    }
}

/// Creates a channel whose sending half is a [`ChannelSink`].
#[must_use]
pub fn channel_sink() -> (ChannelSink, Receiver<WindowSnapshot>) {
    let (tx, rx) = channel();
    (ChannelSink::new(tx), rx)
}
