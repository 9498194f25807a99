//! Relay settings and their layered loading.

mod loader;

pub use loader::{ENV_PREFIX, ENV_SEPARATOR, SettingsLoader};

use crate::core::{ChannelIdentity, DEFAULT_MAX_PAYLOAD, Validate};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log file, inside the `./logs` directory.
pub const DEFAULT_LOG_PATH: &str = "logs/log.txt";

/// Which well-known bus to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// The per-login session bus
    #[default]
    Session,
    /// The system-wide bus
    System,
}

/// Settings shared by every mode of the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Log file written by `write`, watched by `watch`
    pub log_path: PathBuf,
    /// Payload buffer capacity, including the reserved terminator slot
    pub max_payload: usize,
    /// Idle sleep of the dashboard between empty polls
    pub poll_interval_ms: u64,
    /// Channel identity shared by publisher and subscriber
    pub channel: ChannelIdentity,
    /// Bus to use when no explicit address is set
    pub bus: BusKind,
    /// Explicit bus address, e.g. `unix:path=/run/user/1000/bus`
    pub bus_address: Option<String>,
}

impl RelaySettings {
    /// Directory holding the log file.
    pub fn log_dir(&self) -> &Path {
        match self.log_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Idle sleep of the dashboard between empty polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            max_payload: DEFAULT_MAX_PAYLOAD,
            poll_interval_ms: 100,
            channel: ChannelIdentity::default(),
            bus: BusKind::Session,
            bus_address: None,
        }
    }
}

impl Validate for RelaySettings {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.log_path.as_os_str().is_empty() {
            errors.push(ValidationError::invalid_field("log_path", "must not be empty"));
        }
        if self.max_payload < 2 {
            errors.push(ValidationError::invalid_field(
                "max_payload",
                "must be at least 2 (one byte of content plus the terminator slot)",
            ));
        }
        if self.poll_interval_ms == 0 {
            errors.push(ValidationError::invalid_field(
                "poll_interval_ms",
                "must be greater than 0",
            ));
        }
        if matches!(&self.bus_address, Some(address) if address.trim().is_empty()) {
            errors.push(ValidationError::invalid_field("bus_address", "must not be blank"));
        }
        match self.channel.validate() {
            Ok(()) => {}
            Err(ValidationError::Multiple(nested)) => errors.extend(nested),
            Err(e) => errors.push(e),
        }

        ValidationError::collect(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RelaySettings::default();
        assert_eq!(settings.log_path, PathBuf::from("logs/log.txt"));
        assert_eq!(settings.log_dir(), Path::new("logs"));
        assert_eq!(settings.max_payload, 1024);
        assert_eq!(settings.poll_interval(), Duration::from_millis(100));
        assert_eq!(settings.bus, BusKind::Session);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_log_dir_of_bare_file_name() {
        let settings = RelaySettings {
            log_path: PathBuf::from("log.txt"),
            ..RelaySettings::default()
        };
        assert_eq!(settings.log_dir(), Path::new("."));
    }

    #[test]
    fn test_validation_flattens_channel_errors() {
        let settings = RelaySettings {
            max_payload: 1,
            poll_interval_ms: 0,
            channel: ChannelIdentity::new("bad", "bad", ""),
            ..RelaySettings::default()
        };

        match settings.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 5),
            other => panic!("expected five errors, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_bus_address_rejected() {
        let settings = RelaySettings {
            bus_address: Some("  ".to_string()),
            ..RelaySettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
