//! Build engine backed by an external build command.
//!
//! The orchestrator only knows the [`Engine`] and [`Compiler`] traits; this
//! module implements them by running `engine.command` once per build graph.
//! The command receives its graph through environment variables:
//!
//! | Variable            | Value                                   |
//! |---------------------|-----------------------------------------|
//! | `STOKE_BUILD_NAME`  | graph name, or `#<index>`               |
//! | `STOKE_BUILD_INDEX` | position of the graph in `builds`       |
//! | `STOKE_BUILD_GRAPH` | the graph as JSON, dev clients included |
//! | `STOKE_OUT_DIR`     | absolute output directory               |
//! | `STOKE_PUBLIC_PATH` | `output.publicPath`, or `/`             |
//!
//! A non-zero exit fails the cycle. Diagnostics are read from stderr.

mod compiler;
mod cycle;
mod watcher;

pub use compiler::ProcessCompiler;
pub use watcher::{FileChange, FileWatcher, IgnoreRules};

use crate::config::EngineConfig;
use std::path::PathBuf;
use std::sync::Arc;
use stoke_serve::{BuildConfiguration, Compiler, Engine, ServeError};

/// [`Engine`] that turns a build configuration into a [`ProcessCompiler`].
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    settings: EngineConfig,
    root: PathBuf,
}

impl ProcessEngine {
    /// `root` is the absolute project root the command runs in.
    pub fn new(settings: EngineConfig, root: PathBuf) -> Self {
        Self { settings, root }
    }
}

impl Engine for ProcessEngine {
    fn compile(&self, config: BuildConfiguration) -> stoke_serve::Result<Arc<dyn Compiler>> {
        if self.settings.command.trim().is_empty() {
            return Err(ServeError::EngineRejected(
                "no build command configured (set engine.command)".to_string(),
            ));
        }
        if config.is_empty() {
            return Err(ServeError::EngineRejected(
                "configuration has no build graphs".to_string(),
            ));
        }
        if !self.root.is_dir() {
            return Err(ServeError::EngineRejected(format!(
                "project root {} is not a directory",
                self.root.display()
            )));
        }

        tracing::debug!(
            command = %self.settings.command,
            graphs = config.len(),
            "compiler created"
        );

        Ok(Arc::new(ProcessCompiler::new(
            self.settings.clone(),
            self.root.clone(),
            config,
        )))
    }
}
