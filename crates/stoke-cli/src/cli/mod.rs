//! Command-line interface definition.
//!
//! - `stoke dev` - Build, watch and serve with live reload
//! - `stoke check` - Validate configuration without starting anything

mod commands;

use clap::Parser;

pub use commands::{CheckArgs, Command, DevArgs};

/// Stoke - development server orchestration for bundler builds
#[derive(Parser, Debug)]
#[command(
    name = "stoke",
    version,
    about = "Development server with live reload for bundler builds",
    long_about = "Stoke runs your build command for every configured build graph, watches\n\
                  the project for changes and serves the output with live reload."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
