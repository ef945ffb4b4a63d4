//! File system watcher with per-path debouncing.
//!
//! Watches the working directory recursively and forwards create, modify,
//! and remove events over a channel. Duplicate deliveries of the same
//! change inside the debounce window are coalesced; hidden files are
//! skipped. A modify event on a path that no longer exists (a rename-away)
//! is forwarded as a removal.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{Result, ServiceError};

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Created(p) | FileChange::Modified(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Watches a directory tree and delivers [`FileChange`]s in arrival order.
///
/// Dropping the watcher releases the underlying subscription and closes the
/// channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root` recursively.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory does not exist or the platform
    /// watcher cannot be created.
    pub fn new(root: PathBuf, debounce_ms: u64) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.is_dir() {
            return Err(ServiceError::CwdNotFound(root));
        }

        let (tx, rx) = mpsc::channel(256);

        let mut coalesce = Coalesce::new(Duration::from_millis(debounce_ms));
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };
            for path in &event.paths {
                if should_skip(path, &root_clone) {
                    continue;
                }

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    // A rename-away is delivered as a modify on the old
                    // path; the file is gone, so it is a removal.
                    notify::EventKind::Modify(_) if !path.exists() => {
                        FileChange::Removed(path.clone())
                    }
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                if !coalesce.admit(&change, Instant::now()) {
                    continue;
                }

                let _ = tx.blocking_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Suppresses repeat deliveries of the same change inside the window.
///
/// Only identical changes are coalesced: a removal following a modify on
/// the same path is a different change and always passes through.
struct Coalesce {
    window: Duration,
    last: Option<(FileChange, Instant)>,
}

impl Coalesce {
    fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Record `change` and report whether it should be forwarded.
    fn admit(&mut self, change: &FileChange, now: Instant) -> bool {
        if let Some((last, at)) = &self.last {
            if last == change && now.duration_since(*at) < self.window {
                return false;
            }
        }
        self.last = Some((change.clone(), now));
        true
    }
}

/// Skip paths outside the root and anything under a hidden directory.
fn should_skip(path: &Path, root: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return true;
    };
    for component in rel.components() {
        if let Some(name) = component.as_os_str().to_str() {
            if name.starts_with('.') && name != "." && name != ".." {
                return true;
            }
        }
    }
    false
}
