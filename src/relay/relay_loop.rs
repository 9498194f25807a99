//! Watcher -> extractor -> publisher.

use super::{LoopState, Recorder};
use crate::bus::{SignalPublisher, SignalSink};
use crate::error::Result;
use crate::extract::ContentExtractor;
#[cfg(feature = "metrics")]
use crate::metrics::RelayMetrics;
use crate::watch::{ChangeEvent, ChangeSource};
use std::time::Instant;
use tracing::{debug, error, info};

/// Counters of a finished relay loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    /// Change events received
    pub events: u64,
    /// Payloads handed to the bus
    pub published: u64,
    /// Events whose extraction or publish failed
    pub failures: u64,
}

/// Publishes the log file's content every time it changes.
///
/// For each change event the file is read and then published, strictly in
/// that order, before the next event is awaited. A failed read or publish is
/// logged and skipped; the next change triggers a fresh attempt.
///
/// # Examples
///
/// ```rust,no_run
/// use log_relay::bus::{LocalBus, SignalPublisher};
/// use log_relay::core::ChannelIdentity;
/// use log_relay::extract::ContentExtractor;
/// use log_relay::relay::RelayLoop;
/// use log_relay::watch::ChangeWatcher;
///
/// # async fn example() -> log_relay::error::Result<()> {
/// let bus = LocalBus::default();
/// let relay = RelayLoop::new(
///     ChangeWatcher::watch("logs/log.txt")?,
///     ContentExtractor::new("logs/log.txt", 1024),
///     SignalPublisher::new(bus.sink(), ChannelIdentity::default()),
/// );
/// let summary = relay.run().await;
/// println!("published {} payloads", summary.published);
/// # Ok(())
/// # }
/// ```
pub struct RelayLoop<C, S> {
    changes: C,
    stages: Stages<S>,
    state: LoopState,
    summary: RelaySummary,
}

/// The `Processing` half of the loop, kept apart from the change source so
/// it can be borrowed on its own across the publish.
struct Stages<S> {
    extractor: ContentExtractor,
    publisher: SignalPublisher<S>,
    recorder: Recorder,
}

impl<S: SignalSink> Stages<S> {
    async fn relay_once(&self) -> Result<usize> {
        let payload = self.extractor.extract().inspect_err(|_| {
            self.recorder.extract_failure();
        })?;

        let started = Instant::now();
        self.publisher.publish(&payload).await.inspect_err(|_| {
            self.recorder.publish_failure();
        })?;
        self.recorder.published(started);

        Ok(payload.len())
    }
}

impl<C: ChangeSource, S: SignalSink> RelayLoop<C, S> {
    /// Compose a relay loop from its three stages.
    pub fn new(changes: C, extractor: ContentExtractor, publisher: SignalPublisher<S>) -> Self {
        Self {
            changes,
            stages: Stages {
                extractor,
                publisher,
                recorder: Recorder::default(),
            },
            state: LoopState::Idle,
            summary: RelaySummary::default(),
        }
    }

    /// Record loop activity into `metrics`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: RelayMetrics) -> Self {
        self.stages.recorder = Recorder::new(metrics);
        self
    }

    /// Current position in the cycle.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Counters so far.
    pub fn summary(&self) -> RelaySummary {
        self.summary
    }

    /// Extract the current content and publish it once.
    ///
    /// Returns the number of bytes published.
    ///
    /// # Errors
    ///
    /// Any extraction error (`NotFound`, `PermissionDenied`, `Contended`, IO)
    /// or publish error (`EncodingFailed`, `BusUnavailable`).
    pub async fn relay_once(&self) -> Result<usize> {
        self.stages.relay_once().await
    }

    /// Run until the change source closes.
    pub async fn run(mut self) -> RelaySummary {
        info!(path = %self.stages.extractor.path().display(), "relay loop started");

        loop {
            self.state = LoopState::WaitForEvent;
            let Some(event) = self.changes.next_change().await else {
                break;
            };

            self.state = LoopState::Processing;
            self.handle(event).await;
            self.state = LoopState::Idle;
        }

        info!(
            events = self.summary.events,
            published = self.summary.published,
            failures = self.summary.failures,
            "change source closed, relay loop stopped"
        );
        self.summary
    }

    async fn handle(&mut self, event: ChangeEvent) {
        self.summary.events += 1;
        self.stages.recorder.event();

        match self.stages.relay_once().await {
            Ok(bytes) => {
                self.summary.published += 1;
                debug!(seq = event.seq(), bytes, "relayed log change");
            }
            Err(e) => {
                self.summary.failures += 1;
                error!(seq = event.seq(), error = %e, "failed to relay log change");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Inbound, LocalBus, MessageBody, SignalSource};
    use crate::core::ChannelIdentity;
    use crate::error::RelayError;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tracing_test::traced_test;

    /// Shared journal of what the loop did, in order.
    type Journal = Arc<Mutex<Vec<String>>>;

    struct JournaledChanges {
        events: mpsc::UnboundedReceiver<ChangeEvent>,
        journal: Journal,
    }

    #[async_trait]
    impl ChangeSource for JournaledChanges {
        async fn next_change(&mut self) -> Option<ChangeEvent> {
            let event = self.events.recv().await;
            let entry = match event {
                Some(event) => format!("event {}", event.seq()),
                None => "closed".to_string(),
            };
            self.journal.lock().unwrap().push(entry);
            event
        }
    }

    struct JournaledSink {
        journal: Journal,
    }

    #[async_trait]
    impl SignalSink for JournaledSink {
        async fn emit(&self, _identity: &ChannelIdentity, text: &str) -> Result<()> {
            self.journal.lock().unwrap().push(format!("publish {}", text));
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl SignalSink for FailingSink {
        async fn emit(&self, _identity: &ChannelIdentity, _text: &str) -> Result<()> {
            Err(RelayError::BusUnavailable("connection reset".to_string()))
        }
    }

    fn log_file(contents: &str) -> (TempDir, std::path::PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.txt");
        fs::write(&path, contents).unwrap();
        (temp_dir, path)
    }

    #[tokio::test]
    async fn test_each_event_publishes_once_before_next_wait() {
        let (_dir, path) = log_file("line\n");
        let journal: Journal = Arc::default();
        let (tx, events) = mpsc::unbounded_channel();
        for seq in 1..=3 {
            tx.send(ChangeEvent::new(seq)).unwrap();
        }
        drop(tx);

        let relay = RelayLoop::new(
            JournaledChanges {
                events,
                journal: Arc::clone(&journal),
            },
            ContentExtractor::new(&path, 1024),
            SignalPublisher::new(
                JournaledSink {
                    journal: Arc::clone(&journal),
                },
                ChannelIdentity::default(),
            ),
        );
        let summary = relay.run().await;

        assert_eq!(
            summary,
            RelaySummary {
                events: 3,
                published: 3,
                failures: 0
            }
        );
        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "event 1",
                "publish line\n",
                "event 2",
                "publish line\n",
                "event 3",
                "publish line\n",
                "closed",
            ]
        );
    }

    #[tokio::test]
    async fn test_publishes_latest_full_content() {
        let (_dir, path) = log_file("first\n");
        let identity = ChannelIdentity::default();
        let bus = LocalBus::new(8);
        let mut source = bus.subscribe(&identity);
        let relay = RelayLoop::new(
            mpsc::unbounded_channel::<ChangeEvent>().1,
            ContentExtractor::new(&path, 1024),
            SignalPublisher::new(bus.sink(), identity),
        );

        fs::write(&path, "first\nsecond\n").unwrap();
        assert_eq!(relay.relay_once().await.unwrap(), 13);

        match source.pump().await.unwrap() {
            Inbound::Message(msg) => {
                assert_eq!(msg.body, MessageBody::Text("first\nsecond\n".to_string()))
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_continues() {
        let (_dir, path) = log_file("nobody listens\n");
        let bus = LocalBus::new(8);
        let (tx, events) = mpsc::unbounded_channel();
        tx.send(ChangeEvent::new(1)).unwrap();
        tx.send(ChangeEvent::new(2)).unwrap();
        drop(tx);

        let relay = RelayLoop::new(
            events,
            ContentExtractor::new(&path, 1024),
            SignalPublisher::new(bus.sink(), ChannelIdentity::default()),
        );
        let summary = relay.run().await;
        assert_eq!(summary.published, 2);
        assert_eq!(summary.failures, 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_missing_file_is_logged_and_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.txt");
        let bus = LocalBus::new(8);
        let (tx, events) = mpsc::unbounded_channel();

        let relay = RelayLoop::new(
            events,
            ContentExtractor::new(&path, 1024),
            SignalPublisher::new(bus.sink(), ChannelIdentity::default()),
        );

        tx.send(ChangeEvent::new(1)).unwrap();
        tx.send(ChangeEvent::new(2)).unwrap();
        drop(tx);
        let summary = relay.run().await;

        assert_eq!(summary.events, 2);
        assert_eq!(summary.failures, 2);
        assert!(logs_contain("failed to relay log change"));
        assert!(logs_contain("Log file not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    #[traced_test]
    async fn test_contended_read_recovers_on_next_event() {
        use crate::extract::lock::ExclusiveLock;

        let (_dir, path) = log_file("entry\n");
        let identity = ChannelIdentity::default();
        let bus = LocalBus::new(8);
        let mut source = bus.subscribe(&identity);
        let (tx, events) = mpsc::unbounded_channel();
        let mut relay = RelayLoop::new(
            events,
            ContentExtractor::new(&path, 1024),
            SignalPublisher::new(bus.sink(), identity),
        );

        let writer = ExclusiveLock::acquire(fs::File::open(&path).unwrap()).unwrap();
        tx.send(ChangeEvent::new(1)).unwrap();
        let event = relay.changes.next_change().await.unwrap();
        relay.handle(event).await;
        assert_eq!(relay.summary().failures, 1);
        assert_eq!(source.pump().await.unwrap(), Inbound::Empty);
        assert!(logs_contain("locked by a writer"));

        drop(writer);
        tx.send(ChangeEvent::new(2)).unwrap();
        let event = relay.changes.next_change().await.unwrap();
        relay.handle(event).await;
        assert_eq!(relay.summary().published, 1);
        assert!(matches!(source.pump().await.unwrap(), Inbound::Message(_)));
    }

    #[tokio::test]
    async fn test_send_failure_is_recoverable() {
        let (_dir, path) = log_file("entry\n");
        let (tx, events) = mpsc::unbounded_channel();
        tx.send(ChangeEvent::new(1)).unwrap();
        drop(tx);

        let relay = RelayLoop::new(
            events,
            ContentExtractor::new(&path, 1024),
            SignalPublisher::new(FailingSink, ChannelIdentity::default()),
        );
        assert!(matches!(
            relay.relay_once().await,
            Err(RelayError::BusUnavailable(_))
        ));

        let summary = relay.run().await;
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.published, 0);
    }

    #[test]
    fn test_initial_state_is_idle() {
        let relay = RelayLoop::new(
            mpsc::unbounded_channel::<ChangeEvent>().1,
            ContentExtractor::new("log.txt", 1024),
            SignalPublisher::new(LocalBus::new(1).sink(), ChannelIdentity::default()),
        );
        assert_eq!(relay.state(), LoopState::Idle);
        assert_eq!(relay.summary(), RelaySummary::default());
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_loop_with_metrics_relays() {
        let (_dir, path) = log_file("metered\n");
        let identity = ChannelIdentity::default();
        let bus = LocalBus::new(8);
        let mut source = bus.subscribe(&identity);
        let (tx, events) = mpsc::unbounded_channel();
        tx.send(ChangeEvent::new(1)).unwrap();
        drop(tx);

        let relay = RelayLoop::new(
            events,
            ContentExtractor::new(&path, 1024),
            SignalPublisher::new(bus.sink(), identity),
        )
        .with_metrics(RelayMetrics::new(opentelemetry::global::meter("test")));
        let summary = relay.run().await;

        assert_eq!(summary.published, 1);
        assert!(matches!(source.pump().await.unwrap(), Inbound::Message(_)));
    }
}
