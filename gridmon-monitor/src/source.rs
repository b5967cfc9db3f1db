//! Message ingestion.

use std::collections::VecDeque;
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    /// A raw message payload.
    Message(Vec<u8>),
    /// Nothing arrived within the timeout.
    Empty,
    /// The source will never produce another message.
    Closed,
}

/// A source of raw message payloads.
///
/// Each poll waits at most `timeout` and returns at most one message.
/// Connectivity problems belong to the source and are reported through
/// its own channel; the monitor only sees [`Poll`].
pub trait MessageSource {
    /// Waits up to `timeout` for the next message.
    fn poll(&mut self, timeout: Duration) -> Poll;
}

impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    fn poll(&mut self, timeout: Duration) -> Poll {
        (**self).poll(timeout)
    }
}

/// Ready-made messages, then `Closed`. Never waits.
impl MessageSource for VecDeque<Vec<u8>> {
    fn poll(&mut self, _timeout: Duration) -> Poll {
        self.pop_front().map_or(Poll::Closed, Poll::Message)
    }
}

/// Source fed through a bounded channel.
///
/// Any number of producer threads may hold a sender; the monitor thread
/// stays the only consumer.
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
}

impl ChannelSource {
    /// Wraps an existing receiver.
    #[must_use]
    pub fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }
}

impl MessageSource for ChannelSource {
    fn poll(&mut self, timeout: Duration) -> Poll {
        match self.rx.recv_timeout(timeout) {
            Ok(payload) => Poll::Message(payload),
            Err(RecvTimeoutError::Timeout) => Poll::Empty,
            Err(RecvTimeoutError::Disconnected) => Poll::Closed,
        }
    }
}

/// Creates a bounded channel whose receiving half is a [`ChannelSource`].
#[must_use]
pub fn channel_source(bound: usize) -> (SyncSender<Vec<u8>>, ChannelSource) {
    let (tx, rx) = sync_channel(bound);
    (tx, ChannelSource::new(rx))
}
