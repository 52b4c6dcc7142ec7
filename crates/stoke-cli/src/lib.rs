//! Stoke CLI - development server orchestration for bundler builds.
//!
//! Provides the concrete collaborators for the `stoke-serve` orchestrator and
//! the `stoke` binary around them.
//!
//! # Architecture
//!
//! - [`engine`] - Build engine that runs an external command per build graph
//!   and rebuilds on file changes
//! - [`dev`] - axum dev server with Server-Sent-Events live reload
//! - [`config`] - Layered configuration (file, environment, flags)
//! - [`commands`] - `dev` and `check`
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```rust,no_run
//! use stoke_cli::{config::{ServeOverrides, StokeConfig}, error::Result};
//!
//! fn main() -> Result<()> {
//!     let config = StokeConfig::load(None, &ServeOverrides::default())?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod engine;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
