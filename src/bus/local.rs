//! In-process broadcast bus with the same delivery semantics as D-Bus signals.

use super::{BusMessage, Inbound, SignalSink, SignalSource};
use crate::core::ChannelIdentity;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 64;

/// An in-process signal bus.
///
/// Every subscriber registered at the time of a publish gets its own copy of
/// the message, in publish order. Publishing with no subscribers succeeds and
/// delivers nothing. A subscriber that falls more than `capacity` messages
/// behind loses the oldest ones.
///
/// # Examples
///
/// ```rust
/// use log_relay::bus::{LocalBus, SignalPublisher, SignalSubscriber};
/// use log_relay::core::{ChannelIdentity, LogPayload};
///
/// # async fn example() -> log_relay::error::Result<()> {
/// let identity = ChannelIdentity::default();
/// let bus = LocalBus::new(16);
///
/// let mut subscriber = SignalSubscriber::new(bus.subscribe(&identity), identity.clone());
/// let publisher = SignalPublisher::new(bus.sink(), identity);
///
/// publisher
///     .publish(&LogPayload::from_bytes(b"hello".to_vec(), 1024))
///     .await?;
/// assert_eq!(subscriber.next().await.unwrap()?, "hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<BusMessage>,
}

impl LocalBus {
    /// Create a bus buffering up to `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// A publishing handle onto this bus.
    pub fn sink(&self) -> LocalSink {
        LocalSink {
            tx: self.tx.clone(),
        }
    }

    /// Register a subscription matching `identity`'s interface and member.
    ///
    /// Only messages published after this call are received.
    pub fn subscribe(&self, identity: &ChannelIdentity) -> LocalSource {
        LocalSource {
            rx: self.tx.subscribe(),
            rule: identity.clone(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Put an arbitrary message on the bus, as a foreign publisher would.
    ///
    /// Returns how many subscriptions it was queued for.
    pub fn inject(&self, message: BusMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Publishing handle of a [`LocalBus`].
#[derive(Clone)]
pub struct LocalSink {
    tx: broadcast::Sender<BusMessage>,
}

#[async_trait]
impl SignalSink for LocalSink {
    async fn emit(&self, identity: &ChannelIdentity, text: &str) -> Result<()> {
        match self.tx.send(BusMessage::signal(identity, text)) {
            Ok(subscribers) => debug!(subscribers, "signal queued on local bus"),
            Err(_) => debug!("signal emitted with no local subscribers"),
        }
        Ok(())
    }
}

/// Subscription on a [`LocalBus`].
pub struct LocalSource {
    rx: broadcast::Receiver<BusMessage>,
    rule: ChannelIdentity,
}

#[async_trait]
impl SignalSource for LocalSource {
    async fn pump(&mut self) -> Result<Inbound> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) if self.rule.matches(&msg.interface, &msg.member) => {
                    return Ok(Inbound::Message(msg));
                }
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return Ok(Inbound::Empty),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "local subscriber fell behind, oldest signals dropped");
                }
                Err(TryRecvError::Closed) => return Ok(Inbound::Closed),
            }
        }
    }
}
