//! Development server.
//!
//! Implements the orchestrator's server capability with axum:
//! - Live reload via Server-Sent Events
//! - Static files from the build output, mounted under the public path
//! - Error overlay in the browser while the last build is broken

pub mod error_overlay;
pub mod server;
pub mod state;

pub use server::{DevServer, DevServerFactory, RELOAD_SCRIPT_PATH};
pub use state::{BuildStatus, DevServerState, SharedState};

use serde::{Deserialize, Serialize};

/// Events pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevEvent {
    /// A cycle finished without errors
    BuildCompleted { hash: String, duration_ms: u64 },

    /// A cycle finished with errors
    BuildFailed { error: String },

    /// Client connected
    ClientConnected { id: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_tagged() {
        let json = serde_json::to_value(DevEvent::BuildCompleted {
            hash: "abc".to_string(),
            duration_ms: 5,
        })
        .unwrap();
        assert_eq!(json["type"], "BuildCompleted");
        assert_eq!(json["hash"], "abc");

        let json = serde_json::to_value(DevEvent::ClientConnected { id: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ClientConnected", "id": 2}));
    }
}
