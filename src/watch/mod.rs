//! Change notifications for the watched log file.
//!
//! [`ChangeSource`] is the seam the relay loop reads from: the notify-backed
//! [`ChangeWatcher`] in production, or a plain tokio channel when a test wants
//! to drive the loop with a fixed sequence of events.

#[cfg(feature = "file-watch")]
mod watcher;

#[cfg(feature = "file-watch")]
pub use watcher::ChangeWatcher;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// "The watched file may have changed since the last event."
///
/// Carries no diff or offset; consumers re-read the full current state. The
/// sequence number only orders events from one source for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    seq: u64,
}

impl ChangeEvent {
    /// Create an event with the given sequence number.
    pub fn new(seq: u64) -> Self {
        Self { seq }
    }

    /// Position of this event in its source's sequence.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// A lazy, non-restartable sequence of change events.
#[async_trait]
pub trait ChangeSource: Send {
    /// Wait for the next event. `None` means the source is closed for good.
    async fn next_change(&mut self) -> Option<ChangeEvent>;
}

#[async_trait]
impl ChangeSource for mpsc::Receiver<ChangeEvent> {
    async fn next_change(&mut self) -> Option<ChangeEvent> {
        self.recv().await
    }
}

#[async_trait]
impl ChangeSource for mpsc::UnboundedReceiver<ChangeEvent> {
    async fn next_change(&mut self) -> Option<ChangeEvent> {
        self.recv().await
    }
}
