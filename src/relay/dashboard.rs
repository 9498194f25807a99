//! Subscriber -> consumer.

use super::{LoopState, Recorder};
use crate::bus::{SignalSource, SignalSubscriber};
use crate::error::RelayError;
#[cfg(feature = "metrics")]
use crate::metrics::RelayMetrics;
use tracing::{error, info, warn};

/// Counters of a finished dashboard loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    /// Payloads handed to the consumer
    pub received: u64,
    /// Messages dropped because they did not decode
    pub decode_failures: u64,
    /// Other receive errors
    pub errors: u64,
}

/// Hands every received log payload to a consumer callback.
///
/// Malformed messages are logged and skipped; the loop keeps polling.
///
/// # Examples
///
/// ```rust
/// use log_relay::bus::{LocalBus, SignalSink, SignalSubscriber};
/// use log_relay::core::ChannelIdentity;
/// use log_relay::relay::DashboardLoop;
///
/// # async fn example() -> log_relay::error::Result<()> {
/// let identity = ChannelIdentity::default();
/// let bus = LocalBus::default();
/// let subscriber = SignalSubscriber::new(bus.subscribe(&identity), identity.clone());
///
/// bus.sink().emit(&identity, "Log entry at noon\n").await?;
/// drop(bus);
///
/// let mut seen = Vec::new();
/// let summary = DashboardLoop::new(subscriber, |payload: &str| seen.push(payload.to_string()))
///     .run()
///     .await;
/// assert_eq!(summary.received, 1);
/// # Ok(())
/// # }
/// ```
pub struct DashboardLoop<S, F> {
    subscriber: SignalSubscriber<S>,
    consumer: F,
    state: LoopState,
    summary: DashboardSummary,
    recorder: Recorder,
}

impl<S, F> DashboardLoop<S, F>
where
    S: SignalSource,
    F: FnMut(&str) + Send,
{
    /// Feed payloads from `subscriber` into `consumer`.
    pub fn new(subscriber: SignalSubscriber<S>, consumer: F) -> Self {
        Self {
            subscriber,
            consumer,
            state: LoopState::Idle,
            summary: DashboardSummary::default(),
            recorder: Recorder::default(),
        }
    }

    /// Record loop activity into `metrics`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: RelayMetrics) -> Self {
        self.recorder = Recorder::new(metrics);
        self
    }

    /// Current position in the cycle.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until the subscription closes.
    pub async fn run(mut self) -> DashboardSummary {
        info!(rule = %self.subscriber.identity().match_rule(), "dashboard loop started");

        loop {
            self.state = LoopState::WaitForEvent;
            let Some(item) = self.subscriber.next().await else {
                break;
            };

            self.state = LoopState::Processing;
            match item {
                Ok(payload) => {
                    self.summary.received += 1;
                    self.recorder.received();
                    (self.consumer)(&payload);
                }
                Err(RelayError::DecodeFailed(reason)) => {
                    self.summary.decode_failures += 1;
                    self.recorder.decode_failure();
                    warn!(%reason, "skipping malformed signal");
                }
                Err(e) => {
                    self.summary.errors += 1;
                    error!(error = %e, "failed to receive signal");
                }
            }
            self.state = LoopState::Idle;
        }

        info!(
            received = self.summary.received,
            decode_failures = self.summary.decode_failures,
            "subscription closed, dashboard loop stopped"
        );
        self.summary
    }
}
