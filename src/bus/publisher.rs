//! Publishing side of the log channel.

use super::SignalSink;
use crate::core::{ChannelIdentity, LogPayload};
use crate::error::Result;
use tracing::info;

/// Publishes log payloads as fire-and-forget broadcasts on one channel.
pub struct SignalPublisher<S> {
    sink: S,
    identity: ChannelIdentity,
}

impl<S: SignalSink> SignalPublisher<S> {
    /// Create a publisher emitting on `identity` through `sink`.
    pub fn new(sink: S, identity: ChannelIdentity) -> Self {
        Self { sink, identity }
    }

    /// The channel this publisher emits on.
    pub fn identity(&self) -> &ChannelIdentity {
        &self.identity
    }

    /// Broadcast `payload` as a single string argument.
    ///
    /// Completes once the message is handed to the bus. Whether anyone
    /// received it is unknown.
    ///
    /// # Errors
    ///
    /// - [`RelayError::EncodingFailed`](crate::error::RelayError::EncodingFailed) if the payload is not a valid bus string
    /// - [`RelayError::BusUnavailable`](crate::error::RelayError::BusUnavailable) if the send fails
    pub async fn publish(&self, payload: &LogPayload) -> Result<()> {
        let text = payload.as_text()?;
        self.publish_text(text).await
    }

    /// Broadcast an already-decoded string.
    pub async fn publish_text(&self, text: &str) -> Result<()> {
        self.sink.emit(&self.identity, text).await?;
        info!(
            member = %self.identity.member,
            bytes = text.len(),
            "sent log signal"
        );
        Ok(())
    }
}
