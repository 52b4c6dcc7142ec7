//! Stoke Serve - build/serve orchestration for development servers.
//!
//! This crate sits between a build engine and a development HTTP server. It
//! resolves a build configuration, creates a compiler through an [`Engine`],
//! starts a server through a [`ServerFactory`] and publishes one stream of
//! lifecycle events for every build cycle.
//!
//! # Architecture
//!
//! - [`config`] - Raw build graph descriptors and serving options
//! - [`resolve`] - Validation, host/port resolution and dev-client injection
//! - [`engine`] / [`server`] - Capability traits implemented by collaborators
//! - [`classify`] - Per-cycle success/failure classification
//! - [`serve`] - The [`Serve`] orchestrator and its lifecycle state
//! - [`event`] - The public `complete` / `success` / `fail` event stream
//!
//! # Example
//!
//! ```rust,ignore
//! use stoke_serve::{Serve, ServeEvent, ServeOptions};
//!
//! let (serve, mut events) = Serve::new(engine, factory, builds, ServeOptions::default());
//! serve.run().await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let ServeEvent::Success { server_params, .. } = event {
//!         println!("ready at {}", server_params.local_url());
//!     }
//! }
//! ```

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod resolve;
pub mod serve;
pub mod server;
pub mod signal;
pub mod stats;

pub use classify::{Classification, Classifier, Outcome};
pub use config::{BuildGraph, Entry, OutputRules, PluginDescriptor, ServeOptions};
pub use engine::{Compiler, DoneHook, Engine};
pub use error::{ConfigError, ErrorType, Result, ServeError};
pub use event::{ServeEvent, ServeEvents};
pub use resolve::{BuildConfiguration, ServerParameters};
pub use serve::{Serve, ServeState};
pub use server::{ServerFactory, ServerInstance};
pub use signal::ReadinessSignal;
pub use stats::{BuildFailure, BuildStats, ErrorCategory, StatsAsset, StatsMessage};
