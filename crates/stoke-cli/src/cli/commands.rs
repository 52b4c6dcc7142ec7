use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available stoke subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Builds every configured graph, rebuilds on file changes and pushes
    /// reload events to connected browsers.
    Dev(DevArgs),

    /// Validate configuration
    ///
    /// Loads stoke.config.json with environment overrides applied and checks
    /// it without running any build.
    Check(CheckArgs),
}

/// Arguments for the dev command
#[derive(Args, Debug, Default)]
pub struct DevArgs {
    /// Path to the configuration file (defaults to ./stoke.config.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base port for the dev server
    ///
    /// If the port is busy the next 20 ports are tried. Use 0 to let the
    /// operating system pick one.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Host to bind (defaults to 0.0.0.0)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Advertise the server over https
    #[arg(long)]
    pub https: bool,

    /// Apply hot updates only, never fall back to a full page reload
    #[arg(long)]
    pub hot_only: bool,

    /// URL prefix the build output is served under
    #[arg(long, value_name = "PATH")]
    pub public_path: Option<String>,
}

/// Arguments for the check command
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Path to the configuration file (defaults to ./stoke.config.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the JSON schema of the configuration file and exit
    #[arg(long)]
    pub schema: bool,
}
