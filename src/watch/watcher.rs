//! File watching that turns content modifications into change events.

use super::{ChangeEvent, ChangeSource};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Watcher that reports content modifications of a single file.
///
/// Uses the `notify` crate on the exact file (not its directory) and surfaces
/// only data modifications. Every matching backend event becomes one
/// [`ChangeEvent`]; the OS may already have merged rapid writes into fewer
/// events, which is fine because the reader always takes the full current
/// content. The registration lives as long as the watcher.
///
/// # Examples
///
/// ```rust,no_run
/// use log_relay::watch::ChangeWatcher;
///
/// # async fn example() -> log_relay::error::Result<()> {
/// let mut watcher = ChangeWatcher::watch("logs/log.txt")?;
///
/// while let Some(event) = watcher.recv().await {
///     println!("log changed (event {})", event.seq());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    path: PathBuf,
}

impl ChangeWatcher {
    /// Start watching `path` for modifications.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::WatchSetupFailed`] if the path cannot be resolved
    /// (e.g. it does not exist yet) or the backend refuses the registration.
    pub fn watch(path: impl AsRef<Path>) -> Result<Self> {
        let requested = path.as_ref();
        let setup_failed = |reason: String| RelayError::WatchSetupFailed {
            path: requested.to_path_buf(),
            reason,
        };

        let path = requested
            .canonicalize()
            .map_err(|e| setup_failed(format!("failed to resolve path: {}", e)))?;

        let (tx, events) = mpsc::unbounded_channel();
        let mut seq = 0u64;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if is_modification(&event.kind) => {
                    seq += 1;
                    // A closed receiver means the watcher is being dropped.
                    let _ = tx.send(ChangeEvent::new(seq));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "file watcher backend error"),
            }
        })
        .map_err(|e| setup_failed(format!("failed to create file watcher: {}", e)))?;

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| setup_failed(format!("failed to watch path: {}", e)))?;

        debug!(path = %path.display(), "watching for modifications");

        Ok(Self {
            _watcher: watcher,
            events,
            path,
        })
    }

    /// Wait for the next modification.
    ///
    /// Returns `None` only once the backend has shut down.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// The resolved path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChangeSource for ChangeWatcher {
    async fn next_change(&mut self) -> Option<ChangeEvent> {
        self.recv().await
    }
}

fn is_modification(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}
