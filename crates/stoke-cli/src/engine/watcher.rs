//! Recursive file watcher feeding the rebuild loop.
//!
//! Watches the project root and forwards relevant changes through a channel,
//! skipping ignored paths, hidden files and the build output itself.

use crate::error::{CliError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Pending changes buffered before the watcher starts dropping them.
const CHANGE_BUFFER: usize = 256;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    fn from_event(kind: &EventKind, path: &Path) -> Option<Self> {
        let path = path.to_path_buf();
        match kind {
            EventKind::Create(_) => Some(FileChange::Created(path)),
            EventKind::Modify(_) => Some(FileChange::Modified(path)),
            EventKind::Remove(_) => Some(FileChange::Removed(path)),
            _ => None,
        }
    }
}

/// Ignore rules applied to every changed path.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    patterns: Vec<String>,
}

impl IgnoreRules {
    /// `patterns` are either `*.ext` suffixes or root-relative path prefixes.
    pub fn new(root: PathBuf, patterns: Vec<String>) -> Self {
        let patterns = patterns
            .into_iter()
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { root, patterns }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return true;
        };

        let hidden = relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        });
        if hidden {
            return true;
        }

        let relative = relative.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => relative.ends_with(suffix),
            None => {
                relative == *pattern
                    || relative.starts_with(&format!("{}/", pattern))
                    || relative.contains(&format!("/{}/", pattern))
            }
        })
    }
}

/// Watches a directory tree and sends [`FileChange`]s through a channel.
///
/// Dropping the watcher stops delivery.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `rules.root` recursively.
    ///
    /// # Errors
    ///
    /// Returns error if the root does not exist or the OS watcher cannot be
    /// created.
    pub fn new(rules: IgnoreRules) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let root = rules.root.clone();
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(CHANGE_BUFFER);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("file watcher error: {}", e);
                    return;
                }
            };

            for path in &event.paths {
                if rules.is_ignored(path) {
                    continue;
                }
                if let Some(change) = FileChange::from_event(&event.kind, path) {
                    // A full buffer already guarantees a rebuild
                    let _ = tx.try_send(change);
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching for changes");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
