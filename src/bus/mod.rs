//! Broadcast of log payloads over a local signal bus.
//!
//! The loops talk to the bus through two small traits: [`SignalSink`] emits
//! one-way broadcasts, [`SignalSource`] hands back whatever is queued for a
//! subscriber without waiting. Two transports implement them: the in-process
//! [`LocalBus`] and, with the `dbus` feature, the D-Bus session or system bus.
//!
//! Delivery is best effort on both. A broadcast may reach zero, one or many
//! subscribers and nothing in this crate waits for an acknowledgement.
//!
//! Subscribers filter by interface and member only. Any publisher that uses
//! the same names is accepted, which assumes a single-user, single-host trust
//! boundary.

mod local;
mod publisher;
mod subscriber;

#[cfg(feature = "dbus")]
pub mod dbus;

pub use local::{LocalBus, LocalSink, LocalSource};
pub use publisher::SignalPublisher;
pub use subscriber::{DEFAULT_POLL_INTERVAL, SignalSubscriber};

use crate::core::ChannelIdentity;
use crate::error::{RelayError, Result};
use async_trait::async_trait;

/// Argument carried by a bus message, as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Exactly one string argument.
    Text(String),
    /// Anything else; holds a description of what was found.
    Malformed(String),
}

/// A signal envelope on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Object path the signal was emitted from
    pub object_path: String,
    /// Interface name
    pub interface: String,
    /// Signal (member) name
    pub member: String,
    /// Message body
    pub body: MessageBody,
}

impl BusMessage {
    /// A well-formed signal on `identity` carrying `text`.
    pub fn signal(identity: &ChannelIdentity, text: impl Into<String>) -> Self {
        Self {
            object_path: identity.object_path.clone(),
            interface: identity.interface.clone(),
            member: identity.member.clone(),
            body: MessageBody::Text(text.into()),
        }
    }

    /// Check the envelope against `identity` and pull out the string argument.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DecodeFailed`] if the interface or member differ
    /// or the body is not a single string.
    pub fn decode(self, identity: &ChannelIdentity) -> Result<String> {
        if !identity.matches(&self.interface, &self.member) {
            return Err(RelayError::DecodeFailed(format!(
                "unexpected signal {}.{}",
                self.interface, self.member
            )));
        }
        match self.body {
            MessageBody::Text(text) => Ok(text),
            MessageBody::Malformed(found) => Err(RelayError::DecodeFailed(format!(
                "expected a single string argument: {}",
                found
            ))),
        }
    }
}

/// Outcome of one non-blocking pump of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A message was queued.
    Message(BusMessage),
    /// Nothing is queued right now.
    Empty,
    /// The subscription is gone and will never yield again.
    Closed,
}

/// Emits one-way broadcasts.
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// Send `text` as the single string argument of a signal on `identity`.
    ///
    /// Returns once the message has been handed to the bus; delivery to any
    /// subscriber is not confirmed.
    ///
    /// # Errors
    ///
    /// [`RelayError::EncodingFailed`] if the message cannot be built,
    /// [`RelayError::BusUnavailable`] if it cannot be sent.
    async fn emit(&self, identity: &ChannelIdentity, text: &str) -> Result<()>;
}

/// A registered subscription that can be drained without blocking.
#[async_trait]
pub trait SignalSource: Send {
    /// Perform pending bus I/O and pop the next queued message, if any.
    ///
    /// # Errors
    ///
    /// Returns an error for a message that could not be read off the bus; the
    /// subscription stays usable.
    async fn pump(&mut self) -> Result<Inbound>;
}
