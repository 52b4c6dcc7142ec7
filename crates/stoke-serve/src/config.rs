//! Build configuration model.
//!
//! The orchestrator consumes a finished list of [`BuildGraph`] descriptors and
//! a [`ServeOptions`] bag. Both are plain serde types so the CLI can layer
//! them from files, environment and flags before handing them over.

use crate::error::ConfigError;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host the dev server binds when none is configured.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// First port probed when none is configured.
pub const DEFAULT_PORT: u16 = 8899;

/// One build-graph descriptor: entry points, output rules and plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildGraph {
    /// Display name (e.g. "client", "admin")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Entry modules
    pub entry: Entry,

    /// Output rules
    pub output: OutputRules,

    /// Plugins applied to this graph, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginDescriptor>,
}

impl BuildGraph {
    /// Label used in diagnostics: the name, or `#<index>` for unnamed graphs.
    pub fn label(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("#{}", index))
    }
}

/// Entry points of a build graph.
///
/// Accepts a single specifier, a list, or a map of named entry lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Entry {
    Single(String),
    List(Vec<String>),
    Named(IndexMap<String, Vec<String>>),
}

impl Entry {
    /// Whether any module would actually be built.
    pub fn is_empty(&self) -> bool {
        match self {
            Entry::Single(spec) => spec.trim().is_empty(),
            Entry::List(list) => list.is_empty(),
            Entry::Named(map) => map.is_empty() || map.values().any(Vec::is_empty),
        }
    }

    /// All specifiers, in declaration order.
    pub fn modules(&self) -> Vec<&str> {
        match self {
            Entry::Single(spec) => vec![spec.as_str()],
            Entry::List(list) => list.iter().map(String::as_str).collect(),
            Entry::Named(map) => map.values().flatten().map(String::as_str).collect(),
        }
    }
}

/// Where and how a graph writes its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputRules {
    /// Output directory
    pub path: PathBuf,

    /// URL prefix the output is served under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,

    /// Output filename pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// A plugin reference with its options object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginDescriptor {
    /// Plugin name
    pub name: String,

    /// Plugin options (an object, or omitted)
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Dev-server options recognized by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServeOptions {
    /// Advertise the server over https
    #[serde(default)]
    pub https: bool,

    /// Base port to probe (defaults to 8899; 0 lets the OS choose)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Host to bind (defaults to 0.0.0.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Hot updates only, never fall back to a full page reload
    #[serde(default)]
    pub hot_only: bool,

    /// URL prefix the build output is served under
    #[serde(default = "default_public_path")]
    pub public_path: String,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            https: false,
            port: None,
            host: None,
            hot_only: false,
            public_path: default_public_path(),
        }
    }
}

pub fn default_public_path() -> String {
    "/".to_string()
}

/// Validate a raw build configuration.
///
/// # Errors
///
/// - [`ConfigError::Empty`] for an empty list
/// - [`ConfigError::MissingEntry`] for a graph without entry modules
/// - [`ConfigError::InvalidValue`] for an empty output path
/// - [`ConfigError::InvalidPlugin`] for an unnamed plugin or non-object options
pub fn validate_builds(builds: &[BuildGraph]) -> Result<(), ConfigError> {
    if builds.is_empty() {
        return Err(ConfigError::Empty);
    }

    for (index, graph) in builds.iter().enumerate() {
        let label = graph.label(index);

        if graph.entry.is_empty() {
            return Err(ConfigError::MissingEntry { graph: label });
        }

        if graph.output.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("builds[{}].output.path", index),
                value: String::new(),
                hint: "Output path cannot be empty".to_string(),
            });
        }

        for plugin in &graph.plugins {
            if plugin.name.trim().is_empty() {
                return Err(ConfigError::InvalidPlugin {
                    graph: label,
                    plugin: plugin.name.clone(),
                    hint: "Plugin name cannot be empty".to_string(),
                });
            }
            if !(plugin.options.is_object() || plugin.options.is_null()) {
                return Err(ConfigError::InvalidPlugin {
                    graph: label,
                    plugin: plugin.name.clone(),
                    hint: "Plugin options must be an object".to_string(),
                });
            }
        }
    }

    Ok(())
}
