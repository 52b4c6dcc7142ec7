//! Build engine capability traits.
//!
//! The orchestrator never depends on a concrete bundler. It needs an
//! [`Engine`] that turns a resolved configuration into a [`Compiler`], and a
//! compiler that reports every finished cycle to its completion hooks.

use crate::error::Result;
use crate::resolve::BuildConfiguration;
use crate::stats::BuildStats;
use std::fmt;
use std::sync::Arc;

/// Completion hook, called once per finished build cycle.
pub type DoneHook = Box<dyn Fn(Arc<BuildStats>) + Send + Sync>;

/// Factory for compiler instances.
pub trait Engine: Send + Sync {
    /// Create a compiler for `config`.
    ///
    /// The configuration is handed over by value; the compiler owns it from
    /// here on.
    ///
    /// # Errors
    ///
    /// Implementations return [`ServeError::EngineRejected`] when they cannot
    /// work with the configuration.
    ///
    /// [`ServeError::EngineRejected`]: crate::ServeError::EngineRejected
    fn compile(&self, config: BuildConfiguration) -> Result<Arc<dyn Compiler>>;
}

/// A live build engine instance.
pub trait Compiler: Send + Sync + fmt::Debug {
    /// Register a completion hook.
    ///
    /// Hooks run in registration order. Implementations must deliver cycles
    /// one at a time and in the order they finish.
    fn on_done(&self, hook: DoneHook);

    /// Start building and rebuilding on change.
    ///
    /// Called by the dev server once it is listening. Calling it again is a
    /// no-op.
    fn watch(&self) -> Result<()>;
}
