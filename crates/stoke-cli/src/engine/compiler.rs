use super::cycle::{resolve_output_dir, run_cycle};
use super::watcher::{FileChange, FileWatcher, IgnoreRules};
use crate::config::EngineConfig;
use parking_lot::RwLock;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use stoke_serve::{BuildConfiguration, BuildStats, Compiler, DoneHook, ServeError};
use tokio::sync::mpsc;

/// A compiled build configuration driven by an external command.
///
/// Each cycle runs the command once per graph. [`Compiler::watch`] starts the
/// first cycle and re-runs on every debounced batch of file changes.
pub struct ProcessCompiler {
    shared: Arc<Shared>,
    watching: AtomicBool,
}

struct Shared {
    settings: EngineConfig,
    root: PathBuf,
    config: BuildConfiguration,
    hooks: RwLock<Vec<DoneHook>>,
    cycles: AtomicU64,
}

impl ProcessCompiler {
    pub fn new(settings: EngineConfig, root: PathBuf, config: BuildConfiguration) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                root,
                config,
                hooks: RwLock::new(Vec::new()),
                cycles: AtomicU64::new(0),
            }),
            watching: AtomicBool::new(false),
        }
    }

    /// The configuration this compiler builds, dev clients included.
    pub fn config(&self) -> &BuildConfiguration {
        &self.shared.config
    }

    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    /// Number of cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    /// Run a single cycle and deliver it to the registered hooks.
    pub async fn build_once(&self) -> Arc<BuildStats> {
        self.shared.build_and_notify().await
    }

    /// Patterns the watcher skips: configured ignores plus every output dir
    /// under the root, so a build never triggers itself.
    fn ignore_rules(&self) -> IgnoreRules {
        let shared = &self.shared;
        let mut patterns = shared.settings.watch_ignore.clone();
        for graph in shared.config.graphs() {
            let out_dir = resolve_output_dir(&shared.root, &graph.output.path);
            if let Ok(relative) = out_dir.strip_prefix(&shared.root) {
                patterns.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        IgnoreRules::new(shared.root.clone(), patterns)
    }
}

impl Shared {
    async fn build_and_notify(&self) -> Arc<BuildStats> {
        let stats = Arc::new(run_cycle(&self.settings, &self.root, self.config.graphs()).await);
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(
            cycle,
            hash = %stats.hash,
            duration_ms = stats.duration_ms,
            errors = stats.all_errors().len(),
            "build cycle finished"
        );

        let hooks = self.hooks.read();
        for hook in hooks.iter() {
            hook(Arc::clone(&stats));
        }
        stats
    }
}

async fn watch_loop(
    shared: Arc<Shared>,
    watcher: FileWatcher,
    mut changes: mpsc::Receiver<FileChange>,
) {
    let debounce = Duration::from_millis(shared.settings.debounce_ms);
    shared.build_and_notify().await;

    while let Some(first) = changes.recv().await {
        let mut batch = vec![first];
        // Collect until the tree has been quiet for one debounce period
        while let Ok(Some(change)) = tokio::time::timeout(debounce, changes.recv()).await {
            batch.push(change);
        }

        tracing::info!(
            changed = batch.len(),
            first = %batch[0].path().display(),
            "change detected, rebuilding"
        );
        shared.build_and_notify().await;
    }

    tracing::debug!(root = %watcher.root().display(), "file watcher closed");
}

impl Compiler for ProcessCompiler {
    fn on_done(&self, hook: DoneHook) {
        self.shared.hooks.write().push(hook);
    }

    fn watch(&self) -> stoke_serve::Result<()> {
        if self.watching.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let started = tokio::runtime::Handle::try_current()
            .map_err(|e| ServeError::EngineRejected(format!("watch needs a tokio runtime: {}", e)))
            .and_then(|runtime| {
                let (watcher, changes) = FileWatcher::new(self.ignore_rules()).map_err(|e| {
                    ServeError::EngineRejected(format!("cannot watch project root: {}", e))
                })?;
                runtime.spawn(watch_loop(Arc::clone(&self.shared), watcher, changes));
                Ok(())
            });

        if started.is_err() {
            self.watching.store(false, Ordering::SeqCst);
        }
        started
    }
}

impl fmt::Debug for ProcessCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessCompiler")
            .field("command", &self.shared.settings.command)
            .field("root", &self.shared.root)
            .field("graphs", &self.shared.config.len())
            .field("hooks", &self.shared.hooks.read().len())
            .field("watching", &self.watching.load(Ordering::SeqCst))
            .finish()
    }
}
