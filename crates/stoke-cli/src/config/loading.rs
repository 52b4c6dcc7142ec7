use crate::cli::DevArgs;
use crate::config::{CONFIG_FILE, ENV_PREFIX, StokeConfig};
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
    value::{Uncased, UncasedStr},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Dev server settings given on the command line.
///
/// Only flags that were actually passed are serialized, so unset flags never
/// mask values from the file or the environment.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
}

impl From<&DevArgs> for ServeOverrides {
    fn from(args: &DevArgs) -> Self {
        Self {
            https: args.https.then_some(true),
            port: args.port,
            host: args.host.clone(),
            hot_only: args.hot_only.then_some(true),
            public_path: args.public_path.clone(),
        }
    }
}

impl StokeConfig {
    /// Load configuration from every source.
    ///
    /// An explicit `config_path` must exist; the default `stoke.config.json`
    /// is optional.
    pub fn load(config_path: Option<&Path>, overrides: &ServeOverrides) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(StokeConfig::default()));

        if let Some(path) = locate_config_file(config_path)? {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        figment = figment
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .filter_map(env_key)
                    .lowercase(false),
            )
            .merge(Serialized::default("devServer", overrides));

        figment.extract().map_err(|e| {
            let field = if e.path.is_empty() {
                "configuration".to_string()
            } else {
                e.path.join(".")
            };
            ConfigError::InvalidValue {
                field,
                value: e.to_string(),
                hint: "Check stoke.config.json syntax and field types".to_string(),
            }
            .into()
        })
    }
}

fn locate_config_file(config_path: Option<&Path>) -> Result<Option<PathBuf>> {
    match config_path {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(ConfigError::NotFound(path.to_path_buf()).into()),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            Ok(default_path.is_file().then(|| default_path.to_path_buf()))
        }
    }
}

/// Map a prefix-stripped environment key to its configuration path.
///
/// Environment keys are case-insensitive, so camelCase fields are listed
/// explicitly and emitted as-is. Unknown keys are dropped instead of failing
/// extraction.
fn env_key(key: &UncasedStr) -> Option<Uncased<'_>> {
    let path = match key.as_str().to_ascii_lowercase().as_str() {
        "devserver_https" => "devServer.https",
        "devserver_port" => "devServer.port",
        "devserver_host" => "devServer.host",
        "devserver_hotonly" | "devserver_hot_only" => "devServer.hotOnly",
        "devserver_publicpath" | "devserver_public_path" => "devServer.publicPath",
        "engine_command" => "engine.command",
        "engine_cwd" => "engine.cwd",
        "engine_debouncems" | "engine_debounce_ms" => "engine.debounceMs",
        _ => return None,
    };
    Some(Uncased::from(path))
}
