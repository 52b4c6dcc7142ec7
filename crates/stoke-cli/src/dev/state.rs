//! Shared state for the development server.
//!
//! Build status, connected SSE clients and where files are served from.
//! Updated synchronously from the compiler's completion hook and read by
//! request handlers.

use crate::dev::DevEvent;
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use stoke_serve::{BuildFailure, BuildStats};
use tokio::sync::mpsc;

/// Events buffered per client before it counts as gone.
const CLIENT_BUFFER: usize = 100;

/// Build status tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No cycle has finished yet
    NotStarted,
    Success { hash: String, duration_ms: u64 },
    Failed { error: String },
}

impl BuildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    /// Error message if the last cycle failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Connected SSE clients by id.
pub type ClientRegistry = RwLock<HashMap<usize, mpsc::Sender<String>>>;

/// Shared development server state.
pub struct DevServerState {
    status: RwLock<BuildStatus>,
    clients: ClientRegistry,
    next_client_id: AtomicUsize,
    out_dir: PathBuf,
    public_path: String,
    live_reload_path: String,
}

impl DevServerState {
    /// `public_path` must start and end with `/`.
    pub fn new(out_dir: PathBuf, public_path: String, live_reload_path: String) -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            clients: RwLock::new(HashMap::new()),
            next_client_id: AtomicUsize::new(0),
            out_dir,
            public_path,
            live_reload_path,
        }
    }

    pub fn get_status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// Record a finished cycle and return the event to broadcast.
    pub fn record_cycle(&self, stats: &BuildStats) -> DevEvent {
        let (status, event) = match BuildFailure::from_stats(stats) {
            Some(failure) => {
                let error = describe_errors(&failure, stats);
                (
                    BuildStatus::Failed {
                        error: error.clone(),
                    },
                    DevEvent::BuildFailed { error },
                )
            }
            None => (
                BuildStatus::Success {
                    hash: stats.hash.clone(),
                    duration_ms: stats.duration_ms,
                },
                DevEvent::BuildCompleted {
                    hash: stats.hash.clone(),
                    duration_ms: stats.duration_ms,
                },
            ),
        };

        *self.status.write() = status;
        event
    }

    /// Register a new SSE client.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Send an event to every connected client.
    ///
    /// Never blocks: clients that are gone or too far behind are dropped.
    pub fn broadcast(&self, event: &DevEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to encode dev event: {}", e);
                return;
            }
        };

        let mut gone = Vec::new();
        for (id, tx) in self.clients.read().iter() {
            if tx.try_send(json.clone()).is_err() {
                gone.push(*id);
            }
        }

        if !gone.is_empty() {
            let mut clients = self.clients.write();
            for id in gone {
                tracing::debug!(client = id, "dropping SSE client");
                clients.remove(&id);
            }
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn public_path(&self) -> &str {
        &self.public_path
    }

    pub fn live_reload_path(&self) -> &str {
        &self.live_reload_path
    }

    /// Map a request path to a file under the output directory.
    ///
    /// The path is percent-decoded first. Returns `None` outside the public
    /// path, for undecodable paths and for paths escaping the output
    /// directory. Directories map to their `index.html`.
    pub fn resolve_file(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
        let request_path = decoded.as_ref();

        let mount = self.public_path.trim_end_matches('/');
        let rest = if request_path == mount {
            ""
        } else {
            request_path.strip_prefix(&self.public_path)?
        };

        let relative = Path::new(rest);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        let path = self.out_dir.join(relative);
        if path.is_dir() {
            Some(path.join("index.html"))
        } else {
            Some(path)
        }
    }
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<DevServerState>;

fn describe_errors(failure: &BuildFailure, stats: &BuildStats) -> String {
    let mut out = failure.to_string();
    for error in stats.all_errors() {
        out.push_str("\n\n");
        if let Some(file) = &error.file {
            out.push_str(&file.display().to_string());
            if let (Some(line), Some(column)) = (error.line, error.column) {
                out.push_str(&format!(":{}:{}", line, column));
            }
            out.push('\n');
        } else if let Some(module) = &error.module {
            out.push_str(module);
            out.push('\n');
        }
        out.push_str(&error.message);
    }
    out
}
