//! D-Bus transport for the log channel.
//!
//! Signals go out as plain broadcasts (no destination) and come in through a
//! match rule on interface and member. zbus drives the socket on its own
//! task, so popping a queued message never waits.

use super::{BusMessage, Inbound, MessageBody, SignalSink, SignalSource};
use crate::core::ChannelIdentity;
use crate::error::{RelayError, Result};
use crate::settings::BusKind;
use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use std::collections::VecDeque;
use tracing::{debug, warn};
use zbus::message::Type as MessageType;
use zbus::{Connection, MatchRule, Message, MessageStream};

/// Inbound messages zbus buffers per subscription before the oldest are dropped.
const MAX_QUEUED: usize = 64;

/// Connect to the bus selected by `kind`, or to `address` when given.
///
/// # Errors
///
/// Returns [`RelayError::BusUnavailable`] if no bus is reachable.
pub async fn connect(kind: BusKind, address: Option<&str>) -> Result<Connection> {
    let result = match address {
        Some(address) => match zbus::connection::Builder::address(address) {
            Ok(builder) => builder.build().await,
            Err(e) => Err(e),
        },
        None => match kind {
            BusKind::Session => Connection::session().await,
            BusKind::System => Connection::system().await,
        },
    };

    let conn = result.map_err(|e| RelayError::BusUnavailable(e.to_string()))?;
    debug!(unique_name = ?conn.unique_name(), "connected to bus");
    Ok(conn)
}

/// Emits log signals on a D-Bus connection.
#[derive(Clone)]
pub struct DbusSink {
    conn: Connection,
}

impl DbusSink {
    /// Wrap an existing connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Connect and wrap in one step.
    ///
    /// # Errors
    ///
    /// See [`connect`].
    pub async fn connect(kind: BusKind, address: Option<&str>) -> Result<Self> {
        connect(kind, address).await.map(Self::new)
    }
}

#[async_trait]
impl SignalSink for DbusSink {
    async fn emit(&self, identity: &ChannelIdentity, text: &str) -> Result<()> {
        let message = Message::signal(
            identity.object_path.as_str(),
            identity.interface.as_str(),
            identity.member.as_str(),
        )
        .and_then(|builder| builder.build(&(text,)))
        .map_err(|e| RelayError::EncodingFailed(e.to_string()))?;

        // Resolves once the message is written out, not when anyone reads it.
        self.conn
            .send(&message)
            .await
            .map_err(|e| RelayError::BusUnavailable(e.to_string()))
    }
}

/// A match-rule subscription on a D-Bus connection.
///
/// Once the local buffer is empty, a pump moves what zbus has queued into
/// it. zbus drops the oldest messages silently once `MAX_QUEUED` are
/// waiting, so a drain that finds its queue full logs that signals may have
/// been lost.
pub struct DbusSource {
    stream: MessageStream,
    pending: VecDeque<Result<BusMessage>>,
    closed: bool,
}

impl DbusSource {
    /// Install the match rule for `identity` and start queueing its signals.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::BusUnavailable`] if the bus rejects the rule.
    pub async fn subscribe(conn: &Connection, identity: &ChannelIdentity) -> Result<Self> {
        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .interface(identity.interface.as_str())
            .and_then(|builder| builder.member(identity.member.as_str()))
            .map(|builder| builder.build())
            .map_err(|e| RelayError::BusUnavailable(format!("invalid match rule: {}", e)))?;

        let stream = MessageStream::for_match_rule(rule, conn, Some(MAX_QUEUED))
            .await
            .map_err(|e| RelayError::BusUnavailable(format!("failed to add match rule: {}", e)))?;

        debug!(rule = %identity.match_rule(), "match rule installed");
        Ok(Self {
            stream,
            pending: VecDeque::new(),
            closed: false,
        })
    }

    /// Move up to `MAX_QUEUED` ready messages into `pending`, without waiting.
    fn drain(&mut self) -> usize {
        let mut drained = 0;
        while !self.closed && drained < MAX_QUEUED {
            match self.stream.next().now_or_never() {
                None => break,
                Some(None) => self.closed = true,
                Some(Some(item)) => {
                    drained += 1;
                    self.pending.push_back(
                        item.map(|msg| to_bus_message(&msg))
                            .map_err(|e| RelayError::DecodeFailed(e.to_string())),
                    );
                }
            }
        }
        drained
    }
}

#[async_trait]
impl SignalSource for DbusSource {
    async fn pump(&mut self) -> Result<Inbound> {
        if self.pending.is_empty() {
            let drained = self.drain();
            if drained >= MAX_QUEUED {
                warn!(
                    queued = drained,
                    "D-Bus subscription queue was full, older signals may have been dropped"
                );
            }
        }

        match self.pending.pop_front() {
            Some(item) => item.map(Inbound::Message),
            None if self.closed => Ok(Inbound::Closed),
            None => Ok(Inbound::Empty),
        }
    }
}

fn to_bus_message(msg: &Message) -> BusMessage {
    let header = msg.header();
    let body = match msg.body().deserialize::<String>() {
        Ok(text) => MessageBody::Text(text),
        Err(e) => MessageBody::Malformed(e.to_string()),
    };

    BusMessage {
        object_path: header.path().map(ToString::to_string).unwrap_or_default(),
        interface: header
            .interface()
            .map(ToString::to_string)
            .unwrap_or_default(),
        member: header.member().map(ToString::to_string).unwrap_or_default(),
        body,
    }
}
