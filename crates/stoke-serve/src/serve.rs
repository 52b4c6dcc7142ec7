//! Build orchestrator.
//!
//! [`Serve`] sequences configuration resolution, compiler creation and dev
//! server startup, then turns every completion notification from the
//! compiler into `complete` / `success` / `fail` events.
//!
//! ```text
//! Created -> Initializing -> Ready -> Serving -> Running
//!                 |            |         |
//!                 +------------+---------+--> Failed
//! ```
//!
//! Two readiness signals gate the public getters: "compiler ready" resolves
//! when the compiler exists, "server ready" when `run()` has created the
//! server. A failed initialization never resolves "compiler ready", so
//! [`Serve::compiler`] and [`Serve::run`] stay pending; watch
//! [`Serve::state_changes`] to observe [`ServeState::Failed`] instead.

use crate::classify::{Classifier, Outcome};
use crate::config::{BuildGraph, ServeOptions};
use crate::engine::{Compiler, Engine};
use crate::error::{Result, ServeError};
use crate::event::{ServeEvent, ServeEvents};
use crate::resolve::{self, ServerParameters};
use crate::server::{ServerFactory, ServerInstance};
use crate::signal::ReadinessSignal;
use crate::stats::BuildStats;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

/// Buffered events per receiver before it starts lagging.
const EVENT_CAPACITY: usize = 128;

/// Lifecycle state of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeState {
    Created,
    /// Resolving configuration and creating the compiler
    Initializing,
    /// Compiler exists; waiting for `run()`
    Ready,
    /// Server created; waiting for the first build cycle
    Serving,
    /// At least one build cycle has been classified
    Running,
    /// Startup failed; no further transitions
    Failed,
}

impl ServeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServeState::Created => "created",
            ServeState::Initializing => "initializing",
            ServeState::Ready => "ready",
            ServeState::Serving => "serving",
            ServeState::Running => "running",
            ServeState::Failed => "failed",
        }
    }
}

impl fmt::Display for ServeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The build/serve orchestrator.
///
/// Cheap to clone; clones share the same lifecycle. Dropping every clone
/// stops event classification.
#[derive(Clone)]
pub struct Serve {
    inner: Arc<Inner>,
}

struct Inner {
    server_factory: Arc<dyn ServerFactory>,
    compiler_ready: ReadinessSignal<Arc<dyn Compiler>>,
    server_ready: ReadinessSignal<Arc<dyn ServerInstance>>,
    params: ReadinessSignal<Arc<ServerParameters>>,
    events: broadcast::Sender<ServeEvent>,
    state: watch::Sender<ServeState>,
    classifier: Mutex<Classifier>,
    run_started: AtomicBool,
}

impl Serve {
    /// Create an orchestrator and start initializing it in the background.
    ///
    /// Returns the orchestrator together with an event receiver that exists
    /// before initialization starts, so even an immediate `fail` is seen.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        engine: Arc<dyn Engine>,
        server_factory: Arc<dyn ServerFactory>,
        builds: Vec<BuildGraph>,
        options: ServeOptions,
    ) -> (Self, ServeEvents) {
        let (events, rx) = broadcast::channel(EVENT_CAPACITY);
        let (state, _) = watch::channel(ServeState::Created);

        let serve = Self {
            inner: Arc::new(Inner {
                server_factory,
                compiler_ready: ReadinessSignal::new(),
                server_ready: ReadinessSignal::new(),
                params: ReadinessSignal::new(),
                events,
                state,
                classifier: Mutex::new(Classifier::new()),
                run_started: AtomicBool::new(false),
            }),
        };

        serve.inner.set_state(ServeState::Initializing);
        let inner = Arc::clone(&serve.inner);
        tokio::spawn(async move {
            inner.initialize(engine, builds, options).await;
        });

        (serve, ServeEvents::new(rx))
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> ServeEvents {
        ServeEvents::new(self.inner.events.subscribe())
    }

    /// The compiler, once initialization has created it.
    ///
    /// Pending forever if initialization failed.
    pub async fn compiler(&self) -> Arc<dyn Compiler> {
        self.inner.compiler_ready.wait().await
    }

    /// The dev server, once `run()` has created it.
    ///
    /// Pending forever if `run()` is never called.
    pub async fn server(&self) -> Arc<dyn ServerInstance> {
        self.inner.server_ready.wait().await
    }

    /// Resolved server parameters, if resolution has finished.
    pub fn server_parameters(&self) -> Option<Arc<ServerParameters>> {
        self.inner.params.get()
    }

    pub fn state(&self) -> ServeState {
        *self.inner.state.borrow()
    }

    /// Receiver for state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ServeState> {
        self.inner.state.subscribe()
    }

    /// Start serving.
    ///
    /// Waits for the compiler, creates the dev server, hooks classification
    /// into the compiler and starts listening. Only the first call does
    /// anything; later calls return `Ok(())` immediately, even when the
    /// first call failed. Check [`Serve::state`] for [`ServeState::Failed`].
    ///
    /// # Errors
    ///
    /// [`ServeError::ServerStart`] (or whatever the server factory reports)
    /// when the server cannot be created or bound. The orchestrator moves to
    /// [`ServeState::Failed`].
    pub async fn run(&self) -> Result<()> {
        if self.inner.run_started.swap(true, Ordering::SeqCst) {
            debug!("run() already invoked, ignoring");
            return Ok(());
        }

        let compiler = self.inner.compiler_ready.wait().await;
        let params = self.inner.params.wait().await;

        let server = match self
            .inner
            .server_factory
            .create(Arc::clone(&compiler), &params)
        {
            Ok(server) => server,
            Err(e) => return Err(self.inner.fail_serving(e)),
        };

        self.inner.set_state(ServeState::Serving);
        self.inner.server_ready.resolve(Arc::clone(&server));

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        compiler.on_done(Box::new(move |stats: Arc<BuildStats>| {
            if let Some(inner) = weak.upgrade() {
                inner.on_build_done(stats);
            }
        }));

        match server.listen().await {
            Ok(addr) => {
                info!(%addr, url = %params.local_url(), "dev server listening");
                Ok(())
            }
            Err(e) => Err(self.inner.fail_serving(e)),
        }
    }
}

impl fmt::Debug for Serve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serve")
            .field("state", &self.state())
            .field("compiler_ready", &self.inner.compiler_ready)
            .field("server_ready", &self.inner.server_ready)
            .finish()
    }
}

impl Inner {
    async fn initialize(&self, engine: Arc<dyn Engine>, builds: Vec<BuildGraph>, options: ServeOptions) {
        debug!(graphs = builds.len(), "resolving build configuration");

        let (config, params) = match resolve::resolve(builds, &options).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail_startup(e),
        };
        self.params.resolve(Arc::new(params));

        debug!("creating compiler");
        match engine.compile(config) {
            Ok(compiler) => {
                self.set_state(ServeState::Ready);
                self.compiler_ready.resolve(compiler);
                info!("compiler ready");
            }
            Err(e) => self.fail_startup(e),
        }
    }

    /// Startup failure before `run()`: publish `fail{run}` and stop.
    fn fail_startup(&self, error: ServeError) {
        error!(%error, "dev server initialization failed");
        self.set_state(ServeState::Failed);
        self.emit_failure(error);
    }

    /// Startup failure inside `run()`: goes back to the caller, not the stream.
    fn fail_serving(&self, error: ServeError) -> ServeError {
        error!(%error, "dev server failed to start");
        self.set_state(ServeState::Failed);
        error
    }

    fn emit_failure(&self, error: ServeError) {
        let error_type = error.error_type();
        self.emit(ServeEvent::Fail {
            error: Arc::new(error),
            error_type,
        });
    }

    fn on_build_done(&self, stats: Arc<BuildStats>) {
        // Held for the whole cycle so notifications never interleave.
        let mut classifier = self.classifier.lock();

        self.state.send_if_modified(|state| {
            if *state == ServeState::Serving {
                *state = ServeState::Running;
                true
            } else {
                false
            }
        });

        self.emit(ServeEvent::Complete {
            stats: Arc::clone(&stats),
        });

        let classification = classifier.classify(&stats);
        match classification.outcome {
            Outcome::Failure(failure) => {
                debug!(?failure, "build cycle failed");
                self.emit_failure(ServeError::EngineBuild(failure));
            }
            Outcome::Success => match (self.server_ready.get(), self.params.get()) {
                (Some(server), Some(server_params)) => {
                    self.emit(ServeEvent::Success {
                        stats,
                        server,
                        is_first_compile: classification.is_first_build,
                        server_params,
                    });
                }
                _ => tracing::warn!("build finished before the dev server existed"),
            },
        }
    }

    fn emit(&self, event: ServeEvent) {
        let name = event.name();
        if self.events.send(event).is_err() {
            debug!(event = name, "no event subscribers");
        }
    }

    fn set_state(&self, next: ServeState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "state transition");
        }
    }
}
