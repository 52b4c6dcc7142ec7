//! Error taxonomy for the build/serve orchestrator.
//!
//! Errors fall into two groups:
//!
//! - **Startup failures** (`Configuration`, `NetworkResolution`,
//!   `EngineRejected`, `ServerStart`) halt the lifecycle. The first three are
//!   published as `fail` events with [`ErrorType::Run`]; `ServerStart` is
//!   returned to the caller of [`Serve::run`](crate::Serve::run).
//! - **Per-cycle build failures** (`EngineBuild`) are recoverable. They are
//!   published as `fail` events with [`ErrorType::Engine`] and the
//!   orchestrator keeps serving.

use crate::stats::BuildFailure;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Top-level orchestrator error.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The build configuration is empty or malformed.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// No usable host/port could be determined.
    #[error("Cannot resolve dev server address {host}:{port}: {reason}")]
    NetworkResolution {
        /// Requested host
        host: String,
        /// First port that was tried
        port: u16,
        /// What went wrong
        reason: String,
    },

    /// The build engine refused the resolved configuration.
    #[error("Build engine rejected the configuration: {0}")]
    EngineRejected(String),

    /// A build cycle finished with errors.
    #[error("Build failed: {0}")]
    EngineBuild(BuildFailure),

    /// The dev server could not start (bind failure, etc).
    #[error("Failed to start dev server on {address}: {reason}")]
    ServerStart {
        /// Address the server tried to bind
        address: String,
        /// What went wrong
        reason: String,
    },
}

impl ServeError {
    /// Classify this error for the public event stream.
    ///
    /// `ServerStart` never reaches the stream; it maps to `Run` for callers
    /// that want to report it the same way.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ServeError::EngineBuild(_) => ErrorType::Engine,
            _ => ErrorType::Run,
        }
    }
}

/// Configuration validation errors.
///
/// Each variant carries enough context to point at the offending build graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No build graphs were supplied
    #[error("No build configuration supplied\n\nHint: Provide at least one entry in 'builds'")]
    Empty,

    /// A build graph has no entry points
    #[error("Build '{graph}' has no entry points\n\nHint: Add at least one module to 'entry'")]
    MissingEntry {
        /// Name (or index) of the build graph
        graph: String,
    },

    /// A plugin descriptor has the wrong shape
    #[error("Invalid plugin '{plugin}' in build '{graph}'\n\nHint: {hint}")]
    InvalidPlugin {
        /// Name (or index) of the build graph
        graph: String,
        /// Plugin name as written
        plugin: String,
        /// Helpful hint for fixing the plugin
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Origin of a `fail` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    /// Configuration or startup failure; the lifecycle has stopped.
    Run,
    /// The build engine reported errors for one cycle.
    Engine,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Run => "run",
            ErrorType::Engine => "engine",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result alias used across the crate.
pub type Result<T, E = ServeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{BuildFailure, ErrorCategory};

    #[test]
    fn test_config_error_messages_have_hints() {
        let err = ConfigError::MissingEntry {
            graph: "app".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Build 'app' has no entry points"));
        assert!(msg.contains("Hint:"));

        assert!(ConfigError::Empty.to_string().contains("Hint:"));
    }

    #[test]
    fn test_serve_error_from_config_error() {
        let err: ServeError = ConfigError::Empty.into();
        assert!(matches!(err, ServeError::Configuration(ConfigError::Empty)));
        assert_eq!(err.error_type(), ErrorType::Run);
    }

    #[test]
    fn test_engine_build_error_type() {
        let err = ServeError::EngineBuild(BuildFailure {
            message: "boom".to_string(),
            file: None,
            module: None,
            line: None,
            column: None,
            category: ErrorCategory::Other,
            error_count: 1,
        });
        assert_eq!(err.error_type(), ErrorType::Engine);
    }

    #[test]
    fn test_error_type_serialization() {
        assert_eq!(serde_json::to_string(&ErrorType::Run).unwrap(), "\"run\"");
        assert_eq!(
            serde_json::to_string(&ErrorType::Engine).unwrap(),
            "\"engine\""
        );
        assert_eq!(ErrorType::Engine.to_string(), "engine");
    }
}
