//! Dev server capability traits.

use crate::engine::Compiler;
use crate::error::Result;
use crate::resolve::ServerParameters;
use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Creates dev server instances bound to a compiler.
pub trait ServerFactory: Send + Sync {
    /// Build (but do not start) a server for `compiler`.
    ///
    /// # Errors
    ///
    /// [`ServeError::ServerStart`](crate::ServeError::ServerStart) when the
    /// server cannot be set up.
    fn create(
        &self,
        compiler: Arc<dyn Compiler>,
        params: &ServerParameters,
    ) -> Result<Arc<dyn ServerInstance>>;
}

/// A dev server instance.
#[async_trait]
pub trait ServerInstance: Send + Sync + fmt::Debug {
    /// Bind and start serving in the background.
    ///
    /// Returns the bound address once the socket is listening.
    ///
    /// # Errors
    ///
    /// [`ServeError::ServerStart`](crate::ServeError::ServerStart) when the
    /// address cannot be bound.
    async fn listen(&self) -> Result<SocketAddr>;
}
