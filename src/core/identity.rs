//! The fixed (object path, interface, member) triple a relay broadcasts on.

use crate::core::Validate;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Default object path signals are emitted from.
pub const DEFAULT_OBJECT_PATH: &str = "/com/example/LogWatcher";

/// Default interface name of the log signal.
pub const DEFAULT_INTERFACE: &str = "com.example.LogWatcher";

/// Default member (signal) name.
pub const DEFAULT_MEMBER: &str = "NewLog";

const MAX_NAME_LEN: usize = 255;

/// Identity of the broadcast channel shared by publisher and subscriber.
///
/// All three parts must match exactly on both sides for a signal to be
/// delivered. The identity is static for the lifetime of a process and is
/// passed explicitly into [`SignalPublisher`](crate::bus::SignalPublisher)
/// and [`SignalSubscriber`](crate::bus::SignalSubscriber).
///
/// # Examples
///
/// ```rust
/// use log_relay::core::ChannelIdentity;
///
/// let identity = ChannelIdentity::default();
/// assert_eq!(
///     identity.match_rule(),
///     "type='signal',interface='com.example.LogWatcher',member='NewLog'"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelIdentity {
    /// Object path the signal is emitted from
    pub object_path: String,
    /// Interface name
    pub interface: String,
    /// Signal (member) name
    pub member: String,
}

impl ChannelIdentity {
    /// Create a channel identity from its three parts.
    pub fn new(
        object_path: impl Into<String>,
        interface: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            object_path: object_path.into(),
            interface: interface.into(),
            member: member.into(),
        }
    }

    /// The match rule a subscriber installs to receive this channel's signals.
    ///
    /// Selects by interface and member only; the sender is not part of the rule.
    pub fn match_rule(&self) -> String {
        format!(
            "type='signal',interface='{}',member='{}'",
            self.interface, self.member
        )
    }

    /// Whether a message with the given interface and member is a signal of
    /// this channel.
    pub fn matches(&self, interface: &str, member: &str) -> bool {
        self.interface == interface && self.member == member
    }
}

impl Default for ChannelIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_OBJECT_PATH, DEFAULT_INTERFACE, DEFAULT_MEMBER)
    }
}

impl Validate for ChannelIdentity {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if let Err(reason) = check_object_path(&self.object_path) {
            errors.push(ValidationError::invalid_field("channel.object_path", reason));
        }
        if let Err(reason) = check_interface(&self.interface) {
            errors.push(ValidationError::invalid_field("channel.interface", reason));
        }
        if let Err(reason) = check_element(&self.member) {
            errors.push(ValidationError::invalid_field("channel.member", reason));
        }

        ValidationError::collect(errors)
    }
}

fn check_object_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("'{}' must start with '/'", path));
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(format!("'{}' must not end with '/'", path));
    }
    for element in path[1..].split('/') {
        if element.is_empty() {
            return Err(format!("'{}' contains an empty element", path));
        }
        if !element.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("'{}' contains characters outside [A-Za-z0-9_]", path));
        }
    }
    Ok(())
}

fn check_interface(name: &str) -> Result<(), String> {
    if name.len() > MAX_NAME_LEN {
        return Err(format!("longer than {} bytes", MAX_NAME_LEN));
    }
    let elements: Vec<&str> = name.split('.').collect();
    if elements.len() < 2 {
        return Err(format!("'{}' needs at least two dot-separated elements", name));
    }
    for element in elements {
        check_element(element).map_err(|reason| format!("'{}': {}", name, reason))?;
    }
    Ok(())
}

fn check_element(element: &str) -> Result<(), String> {
    if element.is_empty() {
        return Err("must not be empty".to_string());
    }
    if element.len() > MAX_NAME_LEN {
        return Err(format!("longer than {} bytes", MAX_NAME_LEN));
    }
    if element.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(format!("'{}' must not start with a digit", element));
    }
    if !element.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("'{}' contains characters outside [A-Za-z0-9_]", element));
    }
    Ok(())
}
