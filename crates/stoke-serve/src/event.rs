//! Public lifecycle event stream.
//!
//! Events are fire-and-forget: they are delivered in order to every receiver
//! that exists when they are emitted, and late subscribers never see past
//! events.

use crate::error::{ErrorType, ServeError};
use crate::resolve::ServerParameters;
use crate::server::ServerInstance;
use crate::stats::BuildStats;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Lifecycle notification published by [`Serve`](crate::Serve).
#[derive(Debug, Clone)]
pub enum ServeEvent {
    /// A build cycle finished. Always the first event of a cycle.
    Complete { stats: Arc<BuildStats> },

    /// A build cycle finished without errors.
    Success {
        stats: Arc<BuildStats>,
        server: Arc<dyn ServerInstance>,
        is_first_compile: bool,
        server_params: Arc<ServerParameters>,
    },

    /// Startup failed (`Run`) or a build cycle reported errors (`Engine`).
    Fail {
        error: Arc<ServeError>,
        error_type: ErrorType,
    },
}

impl ServeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServeEvent::Complete { .. } => "complete",
            ServeEvent::Success { .. } => "success",
            ServeEvent::Fail { .. } => "fail",
        }
    }
}

/// Receiving end of the event stream.
#[derive(Debug)]
pub struct ServeEvents {
    rx: broadcast::Receiver<ServeEvent>,
}

impl ServeEvents {
    pub(crate) fn new(rx: broadcast::Receiver<ServeEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the orchestrator is gone.
    ///
    /// A receiver that falls too far behind skips the oldest events and
    /// logs a warning.
    pub async fn recv(&mut self) -> Option<ServeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged behind, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ServeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged behind, events dropped");
                }
                Err(_) => return None,
            }
        }
    }
}
