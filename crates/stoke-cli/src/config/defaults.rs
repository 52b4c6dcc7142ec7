/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "stoke.config.json";

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "STOKE_";

pub fn default_watch_ignore() -> Vec<String> {
    vec!["node_modules".to_string(), "*.log".to_string()]
}

pub fn default_debounce_ms() -> u64 {
    100
}
