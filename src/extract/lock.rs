//! Scoped advisory locks on open log files.
//!
//! Guards release the lock and close the file when dropped, so every exit
//! path of a read gives the lock back.

use crate::error::{RelayError, Result};
use std::fs::File;
use std::path::Path;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::fcntl::{Flock, FlockArg};

/// Shared (read) lock held on an open file.
pub(crate) struct SharedLock {
    #[cfg(unix)]
    file: Flock<File>,
    #[cfg(not(unix))]
    file: File,
}

impl SharedLock {
    /// Try to take a shared lock without waiting.
    ///
    /// Fails with [`RelayError::Contended`] when another open file description
    /// holds an exclusive lock.
    #[cfg(unix)]
    pub(crate) fn try_acquire(file: File, path: &Path) -> Result<Self> {
        match Flock::lock(file, FlockArg::LockSharedNonblock) {
            Ok(file) => Ok(Self { file }),
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Err(RelayError::Contended {
                path: path.to_path_buf(),
            }),
            Err((_, errno)) => Err(RelayError::IoError(errno.into())),
        }
    }

    // No advisory locking off unix; reads proceed unlocked.
    #[cfg(not(unix))]
    pub(crate) fn try_acquire(file: File, _path: &Path) -> Result<Self> {
        Ok(Self { file })
    }

    /// The locked file.
    pub(crate) fn file(&self) -> &File {
        &self.file
    }
}

/// Exclusive lock as held by a foreign writer.
#[cfg(test)]
pub(crate) struct ExclusiveLock {
    #[cfg(unix)]
    _file: Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

#[cfg(test)]
impl ExclusiveLock {
    #[cfg(unix)]
    pub(crate) fn acquire(file: File) -> Result<Self> {
        Flock::lock(file, FlockArg::LockExclusive)
            .map(|file| Self { _file: file })
            .map_err(|(_, errno)| RelayError::IoError(errno.into()))
    }

    #[cfg(not(unix))]
    pub(crate) fn acquire(file: File) -> Result<Self> {
        Ok(Self { _file: file })
    }
}
