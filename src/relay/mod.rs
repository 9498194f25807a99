//! The two long-lived loops: file changes to bus, and bus to consumer.
//!
//! Both run the same cycle, `Idle -> WaitForEvent -> Processing -> Idle`, and
//! only stop when their event source closes. Failures inside `Processing` are
//! logged and the loop goes back to waiting.

mod dashboard;
mod relay_loop;

pub use dashboard::{DashboardLoop, DashboardSummary};
pub use relay_loop::{RelayLoop, RelaySummary};

#[cfg(feature = "metrics")]
use crate::metrics::RelayMetrics;
use std::time::Instant;

/// Where a loop is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Between iterations
    Idle,
    /// Blocked on the event source
    WaitForEvent,
    /// Handling one event
    Processing,
}

/// Forwards loop activity to the optional metrics, or drops it.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    #[cfg(feature = "metrics")]
    metrics: Option<RelayMetrics>,
}

impl Recorder {
    #[cfg(feature = "metrics")]
    pub(crate) fn new(metrics: RelayMetrics) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }

    pub(crate) fn event(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_event();
        }
    }

    pub(crate) fn extract_failure(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_extract_failure();
        }
    }

    pub(crate) fn publish_failure(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_publish_failure();
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    pub(crate) fn published(&self, started: Instant) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_published(started);
        }
    }

    pub(crate) fn received(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_received();
        }
    }

    pub(crate) fn decode_failure(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_decode_failure();
        }
    }
}
