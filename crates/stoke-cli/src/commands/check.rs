//! Check command implementation.
//!
//! Validates configuration without building or serving anything.

use crate::cli::CheckArgs;
use crate::config::{CONFIG_FILE, ServeOverrides, StokeConfig};
use crate::error::{ConfigError, Result};
use crate::ui;
use std::path::PathBuf;

/// Execute the check command.
///
/// With `--schema`, prints the JSON schema of stoke.config.json to stdout and
/// exits. Otherwise the file must exist; it is loaded with the environment
/// layered on top and fully validated.
///
/// # Errors
///
/// Returns errors for a missing file or invalid configuration.
pub async fn execute(args: CheckArgs) -> Result<()> {
    if args.schema {
        let schema = serde_json::to_string_pretty(&StokeConfig::json_schema())?;
        println!("{}", schema);
        return Ok(());
    }

    ui::info("Checking configuration...");

    let path = args.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    if !path.is_file() {
        return Err(ConfigError::NotFound(path).into());
    }

    let config = StokeConfig::load(Some(&path), &ServeOverrides::default())?;
    config.validate()?;

    for (index, graph) in config.builds.iter().enumerate() {
        ui::success(&format!(
            "  {}: {} entry module(s) -> {}",
            graph.label(index),
            graph.entry.modules().len(),
            graph.output.path.display()
        ));
    }

    let root = config.project_root()?;
    if !root.is_dir() {
        ui::warning(&format!(
            "Project root {} does not exist yet",
            root.display()
        ));
    }

    ui::info(&format!("Build command: {}", command_line(&config)));
    ui::success("Configuration is valid!");
    Ok(())
}

fn command_line(config: &StokeConfig) -> String {
    std::iter::once(config.engine.command.as_str())
        .chain(config.engine.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
