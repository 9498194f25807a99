//! Bounded snapshot of a log file's content.

use crate::error::{RelayError, Result};

/// Default buffer capacity for a payload, one slot of which is reserved for
/// the terminator.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// An opaque, size-bounded blob of log content.
///
/// A payload built against a capacity of `max_size` holds at most
/// `max_size - 1` bytes; anything beyond that is dropped silently and
/// recorded only in [`is_truncated`](Self::is_truncated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPayload {
    bytes: Vec<u8>,
    truncated: bool,
}

impl LogPayload {
    /// Build a payload from raw bytes, truncating to `max_size - 1` bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use log_relay::core::LogPayload;
    ///
    /// let payload = LogPayload::from_bytes(b"hello world".to_vec(), 6);
    /// assert_eq!(payload.as_bytes(), b"hello");
    /// assert!(payload.is_truncated());
    /// ```
    pub fn from_bytes(mut bytes: Vec<u8>, max_size: usize) -> Self {
        let limit = Self::capacity_for(max_size);
        let truncated = bytes.len() > limit;
        bytes.truncate(limit);
        Self { bytes, truncated }
    }

    /// Number of content bytes a payload can hold for a buffer of `max_size`.
    pub fn capacity_for(max_size: usize) -> usize {
        max_size.saturating_sub(1)
    }

    /// The raw content bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the payload, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Length of the content in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload holds no content.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether content was dropped to fit the capacity.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// View the payload as text for a string-typed bus argument.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::EncodingFailed`] if the content is not valid UTF-8
    /// or contains an interior NUL, neither of which a bus string can carry.
    pub fn as_text(&self) -> Result<&str> {
        let text = std::str::from_utf8(&self.bytes).map_err(|e| {
            RelayError::EncodingFailed(format!("payload is not valid UTF-8: {}", e))
        })?;
        if let Some(offset) = text.find('\0') {
            return Err(RelayError::EncodingFailed(format!(
                "payload contains NUL at byte {}",
                offset
            )));
        }
        Ok(text)
    }
}
