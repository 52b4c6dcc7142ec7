//! Configuration for the stoke CLI.
//!
//! Settings are layered with figment.
//! Priority: CLI flags > `STOKE_*` environment > config file > defaults

mod defaults;
mod loading;
mod validation;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stoke_serve::{BuildGraph, ServeOptions};

pub use defaults::*;
pub use loading::ServeOverrides;

/// Stoke configuration, loaded from stoke.config.json.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StokeConfig {
    /// Build graphs, built in order on every cycle
    #[serde(default)]
    pub builds: Vec<BuildGraph>,

    /// Dev server options
    #[serde(default)]
    pub dev_server: ServeOptions,

    /// Build command settings
    #[serde(default)]
    pub engine: EngineConfig,
}

/// How builds are run and when they are re-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    /// Executable run once per build graph (e.g. "npx")
    #[serde(default)]
    pub command: String,

    /// Arguments passed to the command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Project root; the command runs here and changes below it are watched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Paths under the project root that never trigger a rebuild
    #[serde(default = "default_watch_ignore")]
    pub watch_ignore: Vec<String>,

    /// Quiet period before a batch of changes triggers a rebuild
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: vec![],
            cwd: None,
            watch_ignore: default_watch_ignore(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl StokeConfig {
    /// JSON Schema for stoke.config.json.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(StokeConfig);
        serde_json::to_value(schema).expect("Schema serialization should never fail")
    }

    /// Absolute project root: `engine.cwd` resolved against the current
    /// directory.
    pub fn project_root(&self) -> std::io::Result<PathBuf> {
        let current = std::env::current_dir()?;
        Ok(match &self.engine.cwd {
            Some(cwd) if cwd.is_absolute() => cwd.clone(),
            Some(cwd) => current.join(cwd),
            None => current,
        })
    }
}
