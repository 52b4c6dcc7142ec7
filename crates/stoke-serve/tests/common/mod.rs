//! Mock collaborators shared by the orchestrator integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use stoke_serve::{
    BuildConfiguration, BuildGraph, BuildStats, Compiler, DoneHook, Engine, Entry, OutputRules,
    Result, ServeError, ServeOptions, ServerFactory, ServerInstance, ServerParameters,
    StatsMessage,
};

/// Engine that hands out a single [`MockCompiler`], or rejects everything.
#[derive(Default)]
pub struct MockEngine {
    reject: Option<String>,
    compiler: Arc<MockCompiler>,
    received: Mutex<Option<BuildConfiguration>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            reject: Some(reason.to_string()),
            ..Self::default()
        })
    }

    pub fn compiler(&self) -> Arc<MockCompiler> {
        Arc::clone(&self.compiler)
    }

    /// Configuration passed to `compile`, if it was called.
    pub fn received(&self) -> Option<BuildConfiguration> {
        self.received.lock().clone()
    }
}

impl Engine for MockEngine {
    fn compile(&self, config: BuildConfiguration) -> Result<Arc<dyn Compiler>> {
        if let Some(reason) = &self.reject {
            return Err(ServeError::EngineRejected(reason.clone()));
        }
        *self.received.lock() = Some(config);
        Ok(self.compiler.clone() as Arc<dyn Compiler>)
    }
}

/// Compiler whose build cycles are driven by the test.
#[derive(Default)]
pub struct MockCompiler {
    hooks: Mutex<Vec<DoneHook>>,
    watching: AtomicBool,
}

impl MockCompiler {
    /// Deliver one finished cycle to every registered hook.
    pub fn finish_cycle(&self, stats: BuildStats) {
        let stats = Arc::new(stats);
        for hook in self.hooks.lock().iter() {
            hook(Arc::clone(&stats));
        }
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCompiler")
            .field("hooks", &self.hook_count())
            .finish()
    }
}

impl Compiler for MockCompiler {
    fn on_done(&self, hook: DoneHook) {
        self.hooks.lock().push(hook);
    }

    fn watch(&self) -> Result<()> {
        self.watching.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Server factory counting how many servers it created.
#[derive(Default)]
pub struct MockServerFactory {
    created: AtomicUsize,
    fail_listen: bool,
}

impl MockServerFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Factory whose servers can never bind.
    pub fn failing_listen() -> Arc<Self> {
        Arc::new(Self {
            fail_listen: true,
            ..Self::default()
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ServerFactory for MockServerFactory {
    fn create(
        &self,
        compiler: Arc<dyn Compiler>,
        params: &ServerParameters,
    ) -> Result<Arc<dyn ServerInstance>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockServer {
            compiler,
            address: params.bind_address(),
            port: params.port,
            fail_listen: self.fail_listen,
        }))
    }
}

#[derive(Debug)]
pub struct MockServer {
    compiler: Arc<dyn Compiler>,
    address: String,
    port: u16,
    fail_listen: bool,
}

#[async_trait]
impl ServerInstance for MockServer {
    async fn listen(&self) -> Result<SocketAddr> {
        if self.fail_listen {
            return Err(ServeError::ServerStart {
                address: self.address.clone(),
                reason: "address already in use".to_string(),
            });
        }
        self.compiler.watch()?;
        Ok(SocketAddr::from(([127, 0, 0, 1], self.port)))
    }
}

/// One graph with a single entry module.
pub fn app_graph() -> BuildGraph {
    BuildGraph {
        name: Some("app".to_string()),
        entry: Entry::Single("src/index.js".to_string()),
        output: OutputRules {
            path: PathBuf::from("dist"),
            public_path: None,
            filename: None,
        },
        plugins: vec![],
    }
}

/// Loopback host with an OS-assigned port.
pub fn local_options() -> ServeOptions {
    ServeOptions {
        host: Some("127.0.0.1".to_string()),
        port: Some(0),
        ..ServeOptions::default()
    }
}

pub fn clean_stats(hash: &str) -> BuildStats {
    BuildStats {
        hash: hash.to_string(),
        ..BuildStats::default()
    }
}

pub fn broken_stats(message: &str) -> BuildStats {
    BuildStats {
        hash: "broken".to_string(),
        errors: vec![StatsMessage::new(message)],
        ..BuildStats::default()
    }
}
