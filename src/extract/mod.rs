//! Bounded, lock-aware snapshots of a log file.
//!
//! The extractor never waits on a writer: if the file is exclusively locked
//! the read fails immediately with [`RelayError::Contended`] and the next
//! change event retries it.

pub(crate) mod lock;

use crate::core::LogPayload;
use crate::error::{RelayError, Result};
use lock::SharedLock;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read the current content of `path`, bounded by a buffer of `max_size`.
///
/// At most `max_size - 1` bytes are returned; a file shorter than that is
/// returned whole.
///
/// # Errors
///
/// - [`RelayError::NotFound`] / [`RelayError::PermissionDenied`] if the file cannot be opened
/// - [`RelayError::Contended`] if a writer holds an exclusive lock
/// - [`RelayError::IoError`] if the read itself fails
///
/// # Examples
///
/// ```rust,no_run
/// use log_relay::extract::extract;
///
/// let payload = extract("logs/log.txt", 1024)?;
/// println!("{} bytes", payload.len());
/// # Ok::<(), log_relay::error::RelayError>(())
/// ```
pub fn extract(path: impl AsRef<Path>, max_size: usize) -> Result<LogPayload> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RelayError::from_open(path, e))?;
    let lock = SharedLock::try_acquire(file, path)?;

    // One byte past capacity so truncation is observable.
    let limit = LogPayload::capacity_for(max_size) as u64 + 1;
    let mut bytes = Vec::new();
    lock.file().take(limit).read_to_end(&mut bytes)?;
    drop(lock);

    let payload = LogPayload::from_bytes(bytes, max_size);
    if payload.is_truncated() {
        debug!(path = %path.display(), bytes = payload.len(), "log content truncated to capacity");
    }
    Ok(payload)
}

/// Extractor bound to one path and buffer size.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    path: PathBuf,
    max_size: usize,
}

impl ContentExtractor {
    /// Create an extractor for `path` with a buffer of `max_size` bytes.
    pub fn new(path: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            path: path.into(),
            max_size,
        }
    }

    /// Path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Buffer capacity, including the reserved terminator slot.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Snapshot the file's current content.
    ///
    /// # Errors
    ///
    /// See [`extract`].
    pub fn extract(&self) -> Result<LogPayload> {
        extract(&self.path, self.max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("log.txt");
        fs::write(&log_path, "Log entry at Mon Jan  1 00:00:00 2024\n").unwrap();

        let payload = extract(&log_path, 1024).unwrap();
        assert_eq!(payload.as_text().unwrap(), "Log entry at Mon Jan  1 00:00:00 2024\n");
        assert!(!payload.is_truncated());
    }

    #[test]
    fn test_extract_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("log.txt");
        fs::write(&log_path, "0123456789").unwrap();

        let payload = extract(&log_path, 5).unwrap();
        assert_eq!(payload.as_bytes(), b"0123");
        assert!(payload.is_truncated());
    }

    #[test]
    fn test_extract_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("log.txt");
        fs::write(&log_path, "").unwrap();

        let payload = extract(&log_path, 1024).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_extract_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = extract(temp_dir.path().join("absent.txt"), 1024);
        assert!(matches!(result, Err(RelayError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("log.txt");
        fs::write(&log_path, "secret").unwrap();
        fs::set_permissions(&log_path, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass mode bits.
        if File::open(&log_path).is_ok() {
            return;
        }

        let result = extract(&log_path, 1024);
        assert!(matches!(result, Err(RelayError::PermissionDenied { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_contended_by_writer() {
        use crate::extract::lock::ExclusiveLock;

        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("log.txt");
        fs::write(&log_path, "partial wri").unwrap();

        let writer = ExclusiveLock::acquire(File::open(&log_path).unwrap()).unwrap();
        let result = extract(&log_path, 1024);
        assert!(matches!(result, Err(RelayError::Contended { .. })));

        drop(writer);
        assert_eq!(extract(&log_path, 1024).unwrap().as_bytes(), b"partial wri");
    }

    #[test]
    fn test_extractor_accessors() {
        let extractor = ContentExtractor::new("logs/log.txt", 1024);
        assert_eq!(extractor.path(), Path::new("logs/log.txt"));
        assert_eq!(extractor.max_size(), 1024);
    }
}
