//! Build configuration resolver.
//!
//! Turns the raw build graphs plus [`ServeOptions`] into an immutable
//! [`BuildConfiguration`] and the [`ServerParameters`] the dev server will
//! use. The only step that touches the environment is the host lookup and
//! port probe; everything else is a pure transformation.

use crate::config::{validate_builds, BuildGraph, Entry, ServeOptions, DEFAULT_HOST, DEFAULT_PORT};
use crate::error::{Result, ServeError};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;

/// SSE endpoint the live-reload client connects to.
pub const LIVE_RELOAD_PATH: &str = "/__stoke_sse__";

/// Live-reload client module; the connection URL is appended as a query.
pub const LIVE_RELOAD_CLIENT: &str = "stoke/client";

/// Hot-update runtime that falls back to a full reload.
pub const HOT_CLIENT: &str = "stoke/hot/dev-server";

/// Hot-update runtime that never reloads the page.
pub const HOT_ONLY_CLIENT: &str = "stoke/hot/only-dev-server";

/// How many ports above the base port are probed.
pub const PORT_SEARCH_RANGE: u16 = 20;

/// Resolved build configuration.
///
/// Only the resolver can build one, and it exposes no mutable access: once
/// it reaches the engine it is frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfiguration {
    graphs: Vec<BuildGraph>,
}

impl BuildConfiguration {
    pub fn graphs(&self) -> &[BuildGraph] {
        &self.graphs
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

/// Network parameters of the dev server, derived once per orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerParameters {
    pub host: String,
    pub port: u16,
    pub uses_tls: bool,
    /// Always starts and ends with `/`
    pub public_path: String,
    pub live_reload_path: String,
}

impl ServerParameters {
    pub fn protocol(&self) -> &'static str {
        if self.uses_tls {
            "https"
        } else {
            "http"
        }
    }

    /// `host:port` suitable for binding, with IPv6 hosts bracketed.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Host to put in browser-facing URLs.
    ///
    /// Unspecified bind addresses are shown as `localhost`.
    pub fn display_host(&self) -> &str {
        match self.host.parse::<IpAddr>() {
            Ok(ip) if ip.is_unspecified() => "localhost",
            _ => &self.host,
        }
    }

    /// URL of the served app, e.g. `http://localhost:8899/`.
    pub fn local_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol(),
            self.display_host(),
            self.port,
            self.public_path
        )
    }

    /// URL of the live-reload endpoint.
    pub fn live_reload_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol(),
            self.display_host(),
            self.port,
            self.live_reload_path
        )
    }

    /// Query appended to the live-reload client entry.
    pub fn client_query(&self) -> String {
        format!("?{}", self.live_reload_url())
    }
}

/// Resolve a raw configuration.
///
/// Validates the graphs, probes the network for a usable host/port and
/// injects the dev clients into every entry list.
///
/// # Errors
///
/// - [`ServeError::Configuration`] for an empty or malformed configuration
/// - [`ServeError::NetworkResolution`] when no host/port can be used
pub async fn resolve(
    mut builds: Vec<BuildGraph>,
    options: &ServeOptions,
) -> Result<(BuildConfiguration, ServerParameters)> {
    validate_builds(&builds)?;

    let params = resolve_server_params(options).await?;
    let clients = dev_clients(&params, options.hot_only);
    inject_dev_clients(&mut builds, &clients);

    tracing::debug!(
        graphs = builds.len(),
        address = %params.bind_address(),
        "build configuration resolved"
    );

    Ok((BuildConfiguration { graphs: builds }, params))
}

/// Derive [`ServerParameters`] from the serving options.
///
/// Resolves the host and finds a free port starting at the configured one.
pub async fn resolve_server_params(options: &ServeOptions) -> Result<ServerParameters> {
    let host = options
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_HOST)
        .to_string();
    let base_port = options.port.unwrap_or(DEFAULT_PORT);

    let ip = lookup_host(&host, base_port).await?;
    let port = find_available_port(&host, ip, base_port).await?;

    Ok(ServerParameters {
        host,
        port,
        uses_tls: options.https,
        public_path: normalize_public_path(&options.public_path),
        live_reload_path: LIVE_RELOAD_PATH.to_string(),
    })
}

async fn lookup_host(host: &str, port: u16) -> Result<IpAddr> {
    let network_error = |reason: String| ServeError::NetworkResolution {
        host: host.to_string(),
        port,
        reason,
    };

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| network_error(e.to_string()))?;

    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| network_error("host did not resolve to any address".to_string()))
}

/// Find a bindable port on `ip`, starting at `base_port`.
///
/// Port 0 asks the OS for an ephemeral port. Otherwise the base port and the
/// next [`PORT_SEARCH_RANGE`] ports are tried in order.
async fn find_available_port(host: &str, ip: IpAddr, base_port: u16) -> Result<u16> {
    if base_port == 0 {
        let listener = TcpListener::bind(SocketAddr::new(ip, 0)).await.map_err(|e| {
            ServeError::NetworkResolution {
                host: host.to_string(),
                port: 0,
                reason: e.to_string(),
            }
        })?;
        return listener
            .local_addr()
            .map(|addr| addr.port())
            .map_err(|e| ServeError::NetworkResolution {
                host: host.to_string(),
                port: 0,
                reason: e.to_string(),
            });
    }

    for offset in 0..=PORT_SEARCH_RANGE {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        if TcpListener::bind(SocketAddr::new(ip, port)).await.is_ok() {
            if offset > 0 {
                tracing::warn!("Port {} is busy, using port {} instead", base_port, port);
            }
            return Ok(port);
        }
    }

    Err(ServeError::NetworkResolution {
        host: host.to_string(),
        port: base_port,
        reason: format!(
            "ports {}-{} are all in use",
            base_port,
            base_port.saturating_add(PORT_SEARCH_RANGE)
        ),
    })
}

/// Ensure the public path starts and ends with `/`.
pub fn normalize_public_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Client modules injected ahead of every entry.
pub fn dev_clients(params: &ServerParameters, hot_only: bool) -> Vec<String> {
    let hot = if hot_only { HOT_ONLY_CLIENT } else { HOT_CLIENT };
    vec![
        format!("{}{}", LIVE_RELOAD_CLIENT, params.client_query()),
        hot.to_string(),
    ]
}

/// Prepend `clients` to every entry list of every graph.
///
/// Previously injected clients are removed first, so applying this twice (or
/// with parameters from a retried resolution) never duplicates entries.
pub fn inject_dev_clients(builds: &mut [BuildGraph], clients: &[String]) {
    for graph in builds.iter_mut() {
        if let Entry::Single(spec) = &graph.entry {
            graph.entry = Entry::List(vec![spec.clone()]);
        }

        match &mut graph.entry {
            Entry::List(list) => prepend_clients(list, clients),
            Entry::Named(map) => map
                .values_mut()
                .for_each(|list| prepend_clients(list, clients)),
            Entry::Single(_) => {}
        }
    }
}

fn prepend_clients(list: &mut Vec<String>, clients: &[String]) {
    list.retain(|spec| !is_dev_client(spec));
    list.splice(0..0, clients.iter().cloned());
}

fn is_dev_client(spec: &str) -> bool {
    spec == HOT_CLIENT
        || spec == HOT_ONLY_CLIENT
        || spec == LIVE_RELOAD_CLIENT
        || spec.starts_with(&format!("{}?", LIVE_RELOAD_CLIENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputRules;
    use crate::error::ConfigError;
    use indexmap::IndexMap;
    use std::path::PathBuf;

    fn params() -> ServerParameters {
        ServerParameters {
            host: "0.0.0.0".to_string(),
            port: 8899,
            uses_tls: false,
            public_path: "/".to_string(),
            live_reload_path: LIVE_RELOAD_PATH.to_string(),
        }
    }

    fn graph(entry: Entry) -> BuildGraph {
        BuildGraph {
            name: None,
            entry,
            output: OutputRules {
                path: PathBuf::from("dist"),
                public_path: None,
                filename: None,
            },
            plugins: vec![],
        }
    }

    #[test]
    fn test_normalize_public_path() {
        assert_eq!(normalize_public_path(""), "/");
        assert_eq!(normalize_public_path("/"), "/");
        assert_eq!(normalize_public_path("static"), "/static/");
        assert_eq!(normalize_public_path("/static/assets/"), "/static/assets/");
    }

    #[test]
    fn test_urls_use_localhost_for_unspecified_host() {
        let params = params();
        assert_eq!(params.local_url(), "http://localhost:8899/");
        assert_eq!(
            params.client_query(),
            "?http://localhost:8899/__stoke_sse__"
        );
        assert_eq!(params.bind_address(), "0.0.0.0:8899");
    }

    #[test]
    fn test_https_and_ipv6() {
        let params = ServerParameters {
            host: "::1".to_string(),
            uses_tls: true,
            ..params()
        };
        assert_eq!(params.protocol(), "https");
        assert_eq!(params.bind_address(), "[::1]:8899");
    }

    #[test]
    fn test_dev_clients_hot_only() {
        let clients = dev_clients(&params(), true);
        assert_eq!(clients.len(), 2);
        assert!(clients[0].starts_with("stoke/client?http://"));
        assert_eq!(clients[1], HOT_ONLY_CLIENT);

        let clients = dev_clients(&params(), false);
        assert_eq!(clients[1], HOT_CLIENT);
    }

    #[test]
    fn test_inject_is_idempotent() {
        let mut named = IndexMap::new();
        named.insert("main".to_string(), vec!["src/main.js".to_string()]);
        named.insert("admin".to_string(), vec!["src/admin.js".to_string()]);

        let mut builds = vec![
            graph(Entry::Single("src/index.js".to_string())),
            graph(Entry::Named(named)),
        ];
        let clients = dev_clients(&params(), false);

        inject_dev_clients(&mut builds, &clients);
        let once = builds.clone();
        inject_dev_clients(&mut builds, &clients);
        assert_eq!(builds, once);

        assert_eq!(
            builds[0].entry.modules(),
            vec![clients[0].as_str(), HOT_CLIENT, "src/index.js"]
        );
        match &builds[1].entry {
            Entry::Named(map) => {
                for list in map.values() {
                    assert_eq!(list.len(), 3);
                    assert_eq!(&list[..2], &clients[..]);
                }
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_reinject_with_new_port_replaces_clients() {
        let mut builds = vec![graph(Entry::List(vec!["src/index.js".to_string()]))];
        inject_dev_clients(&mut builds, &dev_clients(&params(), false));

        let moved = ServerParameters {
            port: 9000,
            ..params()
        };
        let clients = dev_clients(&moved, true);
        inject_dev_clients(&mut builds, &clients);

        let modules = builds[0].entry.modules();
        assert_eq!(modules.len(), 3);
        assert!(modules[0].contains(":9000"));
        assert_eq!(modules[1], HOT_ONLY_CLIENT);
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_configuration() {
        let err = resolve(vec![], &ServeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServeError::Configuration(ConfigError::Empty)));
    }

    #[tokio::test]
    async fn test_resolve_with_ephemeral_port() {
        let options = ServeOptions {
            host: Some("127.0.0.1".to_string()),
            port: Some(0),
            public_path: "app".to_string(),
            ..ServeOptions::default()
        };
        let builds = vec![graph(Entry::Single("src/index.js".to_string()))];

        let (config, params) = resolve(builds, &options).await.unwrap();
        assert_ne!(params.port, 0);
        assert_eq!(params.public_path, "/app/");
        assert_eq!(config.len(), 1);
        assert_eq!(config.graphs()[0].entry.modules().len(), 3);
    }

    #[tokio::test]
    async fn test_busy_port_is_skipped() {
        let busy = match std::net::TcpListener::bind(("127.0.0.1", 0)) {
            Ok(listener) => listener,
            Err(err) => {
                eprintln!("Skipping test_busy_port_is_skipped: unable to bind socket ({})", err);
                return;
            }
        };
        let busy_port = busy.local_addr().unwrap().port();
        if busy_port > u16::MAX - PORT_SEARCH_RANGE {
            return;
        }

        let options = ServeOptions {
            host: Some("127.0.0.1".to_string()),
            port: Some(busy_port),
            ..ServeOptions::default()
        };
        let params = resolve_server_params(&options).await.unwrap();
        assert!(params.port > busy_port);
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let options = ServeOptions {
            host: Some("host.invalid".to_string()),
            port: Some(0),
            ..ServeOptions::default()
        };
        let err = resolve_server_params(&options).await.unwrap_err();
        assert!(matches!(err, ServeError::NetworkResolution { .. }));
    }
}
