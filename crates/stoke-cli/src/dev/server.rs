//! Development server with live reload via Server-Sent Events.
//!
//! Serves the build output from disk and pushes a reload notification to
//! every connected browser after each build cycle.

use crate::dev::{DevEvent, DevServerState, SharedState, error_overlay};
use async_trait::async_trait;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use parking_lot::Mutex;
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stoke_serve::{
    BuildStats, Compiler, ServeError, ServerFactory, ServerInstance, ServerParameters,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tower_http::cors::{Any, CorsLayer};

/// Path of the embedded reload client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__stoke_reload__.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/dev/reload-client.js");

/// Placeholder in the reload client replaced by the SSE endpoint.
const SSE_PATH_PLACEHOLDER: &str = "__STOKE_SSE_PATH__";

/// Creates a [`DevServer`] serving files from a fixed output directory.
#[derive(Debug, Clone)]
pub struct DevServerFactory {
    out_dir: PathBuf,
}

impl DevServerFactory {
    /// `out_dir` is the absolute output directory of the first build graph.
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl ServerFactory for DevServerFactory {
    fn create(
        &self,
        compiler: Arc<dyn Compiler>,
        params: &ServerParameters,
    ) -> stoke_serve::Result<Arc<dyn ServerInstance>> {
        let state: SharedState = Arc::new(DevServerState::new(
            self.out_dir.clone(),
            params.public_path.clone(),
            params.live_reload_path.clone(),
        ));

        let hook_state = Arc::clone(&state);
        compiler.on_done(Box::new(move |stats: Arc<BuildStats>| {
            let event = hook_state.record_cycle(&stats);
            hook_state.broadcast(&event);
        }));

        Ok(Arc::new(DevServer::new(compiler, params.clone(), state)))
    }
}

/// Development server.
pub struct DevServer {
    compiler: Arc<dyn Compiler>,
    params: ServerParameters,
    state: SharedState,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DevServer {
    pub fn new(compiler: Arc<dyn Compiler>, params: ServerParameters, state: SharedState) -> Self {
        Self {
            compiler,
            params,
            state,
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Build the axum router with all routes.
    ///
    /// - SSE endpoint for reload events
    /// - Reload client script
    /// - Build output with reload script injection into HTML
    /// - CORS headers (any origin)
    pub fn router(state: SharedState) -> Router {
        let live_reload_path = state.live_reload_path().to_string();

        Router::new()
            .route(&live_reload_path, get(handle_sse))
            .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
            .fallback(handle_request)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state)
    }
}

#[async_trait]
impl ServerInstance for DevServer {
    async fn listen(&self) -> stoke_serve::Result<SocketAddr> {
        let address = self.params.bind_address();
        let start_error = |reason: String| ServeError::ServerStart {
            address: address.clone(),
            reason,
        };

        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| start_error(e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| start_error(e.to_string()))?;

        let app = Self::router(Arc::clone(&self.state));
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("dev server stopped: {}", e);
            }
        });

        if let Err(e) = self.compiler.watch() {
            handle.abort();
            return Err(e);
        }
        *self.task.lock() = Some(handle);

        tracing::debug!(address = %local_addr, "dev server listening");
        Ok(local_addr)
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for DevServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevServer")
            .field("address", &self.params.bind_address())
            .field("out_dir", &self.state.out_dir())
            .field("clients", &self.state.client_count())
            .finish()
    }
}

/// Handle SSE connections for reload events.
async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, stream) = client_events(state.clone());
    tracing::debug!(client = id, "SSE client connected");

    state.broadcast(&DevEvent::ClientConnected { id });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Register a client and wrap its receiver as an SSE stream.
///
/// Dropping the stream (the connection closed) unregisters the client.
fn client_events(state: SharedState) -> (usize, impl Stream<Item = Result<Event, Infallible>>) {
    let (id, rx) = state.register_client();
    let guard = ClientGuard { id, state };
    let stream = ReceiverStream::new(rx).map(move |data| {
        let _guard = &guard;
        Ok::<_, Infallible>(Event::default().data(data))
    });
    (id, stream)
}

struct ClientGuard {
    id: usize,
    state: SharedState,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.state.unregister_client(self.id);
        tracing::debug!(client = self.id, "SSE client disconnected");
    }
}

/// Serve the reload client script.
async fn handle_reload_script(State(state): State<SharedState>) -> Response {
    let script = RELOAD_SCRIPT.replace(SSE_PATH_PLACEHOLDER, state.live_reload_path());
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        script,
    )
        .into_response()
}

/// Serve build output, or the error overlay while the build is broken.
async fn handle_request(State(state): State<SharedState>, uri: Uri) -> Response {
    let path = uri.path();

    if let Some(error) = state.get_status().error() {
        return (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            error_overlay::generate_error_overlay(error),
        )
            .into_response();
    }

    let Some(file) = state.resolve_file(path) else {
        return not_found(path);
    };

    match tokio::fs::read(&file).await {
        Ok(content) => {
            let content_type = determine_content_type(&file);
            let body = if content_type.starts_with("text/html") {
                inject_reload_script(&content)
            } else {
                content
            };
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => not_found(path),
        Err(e) => {
            tracing::warn!("failed to read {}: {}", file.display(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read {}", path),
            )
                .into_response()
        }
    }
}

fn not_found(path: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("File not found: {}", path)).into_response()
}

/// Insert the reload client before the closing `</body>` tag, or append it.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let script_tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);

    let mut result = String::with_capacity(html.len() + script_tag.len() + 4);
    match html.rfind("</body>") {
        Some(pos) => {
            result.push_str(&html[..pos]);
            result.push_str(&script_tag);
            result.push('\n');
            result.push_str(&html[pos..]);
        }
        None => {
            result.push_str(&html);
            result.push('\n');
            result.push_str(&script_tag);
        }
    }
    result.into_bytes()
}

/// Determine content type from file extension.
fn determine_content_type(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" | "cjs" => "application/javascript",
        "json" | "map" => "application/json",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_client_stream_unregisters() {
        let state = Arc::new(DevServerState::new(
            PathBuf::from("dist"),
            "/".to_string(),
            "/__stoke_sse__".to_string(),
        ));

        let (first, stream) = client_events(Arc::clone(&state));
        let (second, _kept) = client_events(Arc::clone(&state));
        assert_ne!(first, second);
        assert_eq!(state.client_count(), 2);

        drop(stream);
        assert_eq!(state.client_count(), 1);
    }

    #[test]
    fn test_inject_reload_script_before_body() {
        let result = inject_reload_script(b"<html><body><h1>Hi</h1></body></html>");
        let html = String::from_utf8(result).unwrap();

        let script = html.find(r#"<script src="/__stoke_reload__.js"></script>"#).unwrap();
        let body = html.find("</body>").unwrap();
        assert!(script < body);
    }

    #[test]
    fn test_inject_reload_script_without_body() {
        let result = inject_reload_script(b"<h1>Hi</h1>");
        let html = String::from_utf8(result).unwrap();
        assert!(html.ends_with(r#"<script src="/__stoke_reload__.js"></script>"#));
    }

    #[test]
    fn test_determine_content_type() {
        assert_eq!(
            determine_content_type(Path::new("dist/index.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            determine_content_type(Path::new("main.mjs")),
            "application/javascript"
        );
        assert_eq!(
            determine_content_type(Path::new("main.js.map")),
            "application/json"
        );
        assert_eq!(
            determine_content_type(Path::new("LICENSE")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_reload_script_has_placeholder() {
        assert!(RELOAD_SCRIPT.contains(SSE_PATH_PLACEHOLDER));
    }
}
