//! Receiving side of the log channel.

use super::{Inbound, SignalSource};
use crate::core::ChannelIdentity;
use crate::error::Result;
use std::time::Duration;

/// Idle sleep between empty polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Turns a [`SignalSource`] into a lazy sequence of decoded payloads.
///
/// Polls cooperatively: pump the bus, pop one message, and when nothing is
/// queued sleep for the poll interval before trying again. A message that
/// fails to decode is yielded as an error item and the sequence carries on.
pub struct SignalSubscriber<S> {
    source: S,
    identity: ChannelIdentity,
    poll_interval: Duration,
}

impl<S: SignalSource> SignalSubscriber<S> {
    /// Create a subscriber decoding signals of `identity` from `source`.
    pub fn new(source: S, identity: ChannelIdentity) -> Self {
        Self {
            source,
            identity,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the idle sleep between empty polls.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The idle sleep between empty polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The channel this subscriber decodes.
    pub fn identity(&self) -> &ChannelIdentity {
        &self.identity
    }

    /// Check once for a queued message without sleeping.
    ///
    /// `Ok(None)` means nothing was queued; the outer `None` means the
    /// subscription has closed.
    pub async fn try_next(&mut self) -> Option<Result<Option<String>>> {
        match self.source.pump().await {
            Ok(Inbound::Message(msg)) => Some(msg.decode(&self.identity).map(Some)),
            Ok(Inbound::Empty) => Some(Ok(None)),
            Ok(Inbound::Closed) => None,
            Err(e) => Some(Err(e)),
        }
    }

    /// Wait for the next payload, sleeping between empty polls.
    ///
    /// Returns `None` once the subscription has closed. Decode failures come
    /// back as `Some(Err(..))` and do not end the sequence.
    pub async fn next(&mut self) -> Option<Result<String>> {
        loop {
            match self.try_next().await? {
                Ok(Some(payload)) => return Some(Ok(payload)),
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusMessage, LocalBus, MessageBody, SignalSink};
    use crate::error::RelayError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Source replaying a fixed script of pump outcomes.
    struct ScriptedSource {
        script: VecDeque<Inbound>,
        pumps: usize,
    }

    #[async_trait]
    impl SignalSource for ScriptedSource {
        async fn pump(&mut self) -> Result<Inbound> {
            self.pumps += 1;
            Ok(self.script.pop_front().unwrap_or(Inbound::Closed))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_polls_sleep_between_pumps() {
        let identity = ChannelIdentity::default();
        let script = VecDeque::from(vec![
            Inbound::Empty,
            Inbound::Empty,
            Inbound::Empty,
            Inbound::Message(BusMessage::signal(&identity, "late")),
        ]);
        let mut subscriber = SignalSubscriber::new(ScriptedSource { script, pumps: 0 }, identity);

        let start = Instant::now();
        assert_eq!(subscriber.next().await.unwrap().unwrap(), "late");
        assert_eq!(start.elapsed(), DEFAULT_POLL_INTERVAL * 3);
        assert_eq!(subscriber.source.pumps, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_poll_interval() {
        let identity = ChannelIdentity::default();
        let script = VecDeque::from(vec![
            Inbound::Empty,
            Inbound::Message(BusMessage::signal(&identity, "x")),
        ]);
        let mut subscriber = SignalSubscriber::new(ScriptedSource { script, pumps: 0 }, identity)
            .with_poll_interval(Duration::from_millis(10));
        assert_eq!(subscriber.poll_interval(), Duration::from_millis(10));

        let start = Instant::now();
        subscriber.next().await.unwrap().unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_end_sequence() {
        let identity = ChannelIdentity::default();
        let bus = LocalBus::new(8);
        let mut subscriber = SignalSubscriber::new(bus.subscribe(&identity), identity.clone());

        let mut malformed = BusMessage::signal(&identity, "");
        malformed.body = MessageBody::Malformed("signature 'u'".to_string());
        bus.inject(malformed);
        bus.sink().emit(&identity, "well formed").await.unwrap();

        assert!(matches!(
            subscriber.next().await,
            Some(Err(RelayError::DecodeFailed(_)))
        ));
        assert_eq!(subscriber.next().await.unwrap().unwrap(), "well formed");
    }

    #[tokio::test]
    async fn test_try_next_reports_empty_and_closed() {
        let identity = ChannelIdentity::default();
        let bus = LocalBus::new(8);
        let mut subscriber = SignalSubscriber::new(bus.subscribe(&identity), identity);

        assert!(matches!(subscriber.try_next().await, Some(Ok(None))));
        drop(bus);
        assert!(subscriber.try_next().await.is_none());
        assert!(subscriber.next().await.is_none());
    }

    #[tokio::test]
    async fn test_two_subscribers_receive_same_payload() {
        let identity = ChannelIdentity::default();
        let bus = LocalBus::new(8);
        let mut first = SignalSubscriber::new(bus.subscribe(&identity), identity.clone());
        let mut second = SignalSubscriber::new(bus.subscribe(&identity), identity.clone());

        bus.sink().emit(&identity, "shared").await.unwrap();

        assert_eq!(first.next().await.unwrap().unwrap(), "shared");
        assert_eq!(second.next().await.unwrap().unwrap(), "shared");
    }
}
