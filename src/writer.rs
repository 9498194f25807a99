//! Appending timestamped entries to the watched log file.
//!
//! Each entry goes out as one append-mode write with no advisory lock held.
//! The relay reads as soon as the modification is reported, and a read that
//! finds the file locked is dropped as
//! [`RelayError::Contended`](crate::error::RelayError::Contended).

use crate::error::{RelayError, Result};
use chrono::{DateTime, Local};
use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::DirBuilderExt;

/// Timestamp layout of an entry, e.g. `Mon Jan  6 09:05:00 2025`.
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Format one log line for `at`, including the trailing newline.
pub fn format_entry(at: DateTime<Local>) -> String {
    format!("Log entry at {}\n", at.format(TIMESTAMP_FORMAT))
}

/// Append a `Log entry at <now>` line to `path`.
///
/// Creates the parent directory (mode 0755 on unix) and the file if they do
/// not exist. Returns the line that was written.
///
/// # Errors
///
/// - [`RelayError::PermissionDenied`] if the directory or file cannot be created
/// - [`RelayError::IoError`] if writing fails
///
/// # Examples
///
/// ```rust,no_run
/// use log_relay::writer::append_entry;
///
/// let line = append_entry("logs/log.txt")?;
/// print!("{}", line);
/// # Ok::<(), log_relay::error::RelayError>(())
/// ```
pub fn append_entry(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder
            .create(dir)
            .map_err(|e| RelayError::from_open(dir, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RelayError::from_open(path, e))?;

    let line = format_entry(Local::now());
    file.write_all(line.as_bytes())?;
    drop(file);

    debug!(path = %path.display(), bytes = line.len(), "log entry appended");
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_entry() {
        let at = Local.with_ymd_and_hms(2025, 1, 6, 9, 5, 0).unwrap();
        assert_eq!(format_entry(at), "Log entry at Mon Jan  6 09:05:00 2025\n");

        let at = Local.with_ymd_and_hms(2024, 11, 23, 17, 42, 9).unwrap();
        assert_eq!(format_entry(at), "Log entry at Sat Nov 23 17:42:09 2024\n");
    }

    #[test]
    fn test_append_creates_directory_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("log.txt");

        let line = append_entry(&path).unwrap();
        assert!(line.starts_with("Log entry at "));
        assert!(line.ends_with('\n'));
        assert_eq!(fs::read_to_string(&path).unwrap(), line);
    }

    #[cfg(unix)]
    #[test]
    fn test_created_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("logs");
        append_entry(dir.join("log.txt")).unwrap();

        let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        // umask can only clear bits
        assert_eq!(mode & !0o755, 0);
    }

    #[test]
    fn test_appends_accumulate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.txt");

        let first = append_entry(&path).unwrap();
        let second = append_entry(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{}{}", first, second)
        );
    }

    #[test]
    fn test_existing_content_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.txt");
        fs::write(&path, "earlier\n").unwrap();

        append_entry(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("earlier\nLog entry at "));
    }

    #[cfg(unix)]
    #[test]
    fn test_append_leaves_file_unlocked() {
        use crate::extract::lock::SharedLock;
        use nix::fcntl::{Flock, FlockArg};
        use std::fs::File;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.txt");
        let line = append_entry(&path).unwrap();

        // A reader racing the change notification must not see a writer lock.
        assert!(SharedLock::try_acquire(File::open(&path).unwrap(), &path).is_ok());
        assert!(Flock::lock(File::open(&path).unwrap(), FlockArg::LockExclusiveNonblock).is_ok());
        assert_eq!(crate::extract::extract(&path, 1024).unwrap().as_text().unwrap(), line);
    }
}
