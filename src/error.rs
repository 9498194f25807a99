//! Error types for log-relay.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Result type alias for log-relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can occur while extracting, publishing or receiving log content.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The log file does not exist.
    #[error("Log file not found: {}", path.display())]
    NotFound {
        /// Path that could not be opened
        path: PathBuf,
    },

    /// The log file exists but cannot be opened for reading.
    #[error("Permission denied: {}", path.display())]
    PermissionDenied {
        /// Path that could not be opened
        path: PathBuf,
    },

    /// A writer currently holds an exclusive lock on the log file.
    #[error("Log file is locked by a writer: {}", path.display())]
    Contended {
        /// Path of the contended file
        path: PathBuf,
    },

    /// No IPC bus is reachable, or the connection failed while sending.
    #[error("IPC bus unavailable: {0}")]
    BusUnavailable(String),

    /// The payload could not be serialized into a bus message.
    #[error("Failed to encode signal payload: {0}")]
    EncodingFailed(String),

    /// The path could not be registered with the filesystem watcher.
    #[error("Failed to watch {}: {reason}", path.display())]
    WatchSetupFailed {
        /// Path that could not be watched
        path: PathBuf,
        /// Reason reported by the watcher backend
        reason: String,
    },

    /// A received bus message did not match the expected signal or argument type.
    #[error("Failed to decode signal: {0}")]
    DecodeFailed(String),

    /// Failed to load settings.
    #[error("Failed to load settings: {0}")]
    ConfigError(String),

    /// Settings validation failed.
    #[error("Settings validation failed: {0}")]
    ValidationError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl RelayError {
    /// Map an error raised while opening `path` onto the relay taxonomy.
    pub(crate) fn from_open(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Self::IoError(err),
        }
    }

    /// Whether a loop may log this error and carry on with the next event.
    ///
    /// Watch registration, settings and validation failures only happen during
    /// setup and are fatal. `BusUnavailable` is recoverable here because a send
    /// failure mid-loop is transient; a failed initial connection is handled
    /// as fatal by the caller that performs the setup.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::WatchSetupFailed { .. } | Self::ConfigError(_) | Self::ValidationError(_)
        )
    }
}

/// Validation error for settings validation.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Collapse a list of errors: `Ok` when empty, the single error when there
    /// is one, `Multiple` otherwise.
    pub fn collect(mut errors: Vec<ValidationError>) -> std::result::Result<(), ValidationError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for RelayError {
    fn from(err: ValidationError) -> Self {
        RelayError::ValidationError(err.to_string())
    }
}
