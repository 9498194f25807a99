//! Settings loader that layers defaults, a file and environment overrides.

use super::RelaySettings;
use crate::core::Validate;
use crate::error::{RelayError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment overrides, e.g. `LOG_RELAY_LOG_PATH`.
pub const ENV_PREFIX: &str = "LOG_RELAY";

/// Separator for nested keys, e.g. `LOG_RELAY_CHANNEL__MEMBER`.
pub const ENV_SEPARATOR: &str = "__";

/// Loads [`RelaySettings`] with standard precedence.
///
/// Lowest to highest: built-in defaults, the settings file (if any),
/// environment variables. The merged result is validated before it is
/// returned.
///
/// # Examples
///
/// ```rust,no_run
/// use log_relay::settings::SettingsLoader;
///
/// # fn example() -> log_relay::error::Result<()> {
/// let settings = SettingsLoader::new()
///     .with_file("relay.toml")
///     .load()?;
/// println!("watching {}", settings.log_path.display());
/// # Ok(())
/// # }
/// ```
pub struct SettingsLoader {
    file_path: Option<PathBuf>,
    env_prefix: Option<String>,
    env_separator: String,
}

impl SettingsLoader {
    /// Create a loader reading `LOG_RELAY_*` environment overrides and no file.
    pub fn new() -> Self {
        Self {
            file_path: None,
            env_prefix: Some(ENV_PREFIX.to_string()),
            env_separator: ENV_SEPARATOR.to_string(),
        }
    }

    /// Layer a settings file over the defaults.
    ///
    /// Supported formats: TOML (.toml), YAML (.yaml, .yml), JSON (.json)
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Read environment overrides with a custom prefix and nesting separator.
    pub fn with_env_overrides(mut self, prefix: &str, separator: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.env_separator = separator.to_string();
        self
    }

    /// Ignore the environment entirely.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Load, merge and validate the settings.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConfigError`] if the file is missing or
    /// unreadable or a value has the wrong type, and
    /// [`RelayError::ValidationError`] if the merged settings are invalid.
    pub fn load(&self) -> Result<RelaySettings> {
        let defaults = Config::try_from(&RelaySettings::default())
            .map_err(|e| RelayError::ConfigError(format!("Failed to encode defaults: {}", e)))?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = &self.file_path {
            validate_extension(path)?;
            if !path.exists() {
                return Err(RelayError::ConfigError(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.clone()).required(true));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator(&self.env_separator)
                    .try_parsing(true),
            );
        }

        let settings: RelaySettings = builder
            .build()
            .map_err(|e| RelayError::ConfigError(format!("Failed to load settings: {}", e)))?
            .try_deserialize()
            .map_err(|e| RelayError::ConfigError(format!("Failed to parse settings: {}", e)))?;

        settings.validate()?;

        debug!(
            log_path = %settings.log_path.display(),
            max_payload = settings.max_payload,
            member = %settings.channel.member,
            "settings loaded"
        );
        Ok(settings)
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            RelayError::ConfigError(format!(
                "Unable to determine file format for: {}",
                path.display()
            ))
        })?;

    match extension {
        "yaml" | "yml" | "toml" | "json" => Ok(()),
        _ => Err(RelayError::ConfigError(format!(
            "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        ))),
    }
}
