//! Development server command implementation.
//!
//! Wires the process engine and the axum dev server into the orchestrator,
//! reports its events on the terminal and runs until Ctrl+C or a fatal
//! startup failure.

use crate::cli::DevArgs;
use crate::config::{ServeOverrides, StokeConfig};
use crate::dev::DevServerFactory;
use crate::engine::ProcessEngine;
use crate::error::{CliError, Result};
use crate::ui;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stoke_serve::{ErrorType, Serve, ServeError, ServeEvent, ServeEvents};
use tokio::signal;
use tokio::sync::mpsc;

/// Warnings listed individually after a successful build.
const MAX_LISTED_WARNINGS: usize = 5;

/// Execute the dev command.
///
/// # Process Flow
///
/// 1. Load configuration (file, environment, flags)
/// 2. Create the engine and server factory, hand both to [`Serve`]
/// 3. Report lifecycle events in the background
/// 4. `run()` the orchestrator, then wait for Ctrl+C
///
/// # Errors
///
/// Returns errors for invalid configuration and for startup failures
/// (unresolvable address, rejected configuration, bind failure).
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let config = StokeConfig::load(args.config.as_deref(), &ServeOverrides::from(&args))?;
    let root = config.project_root()?;
    ui::info(&format!("Project root: {}", root.display()));

    let out_dir = served_dir(&config, &root);
    tracing::debug!(out_dir = %out_dir.display(), "serving build output");

    let engine = Arc::new(ProcessEngine::new(config.engine.clone(), root));
    let factory = Arc::new(DevServerFactory::new(out_dir));
    let (serve, events) = Serve::new(engine, factory, config.builds, config.dev_server);

    let (fatal_tx, mut fatal_rx) = mpsc::channel(1);
    let reporter = tokio::spawn(report_events(events, fatal_tx));

    // A failed initialization never lets run() finish; the reporter sees it
    let run = serve.run();
    tokio::pin!(run);
    let mut running = false;

    let outcome = loop {
        tokio::select! {
            result = &mut run, if !running => {
                if let Err(e) = result {
                    break Err(CliError::from(e));
                }
                running = true;
                if let Some(params) = serve.server_parameters() {
                    ui::success(&format!(
                        "Development server running at {}",
                        params.local_url()
                    ));
                }
                ui::info("Press Ctrl+C to stop");
            }
            Some(error) = fatal_rx.recv() => break Err(error),
            result = signal::ctrl_c() => {
                break result.map_err(CliError::from);
            }
        }
    };

    reporter.abort();
    outcome?;

    ui::info("Shutting down...");
    Ok(())
}

/// Directory the dev server serves: the first graph's output path.
fn served_dir(config: &StokeConfig, root: &Path) -> PathBuf {
    let output = config
        .builds
        .first()
        .map(|graph| graph.output.path.clone())
        .unwrap_or_else(|| PathBuf::from("dist"));

    if output.is_absolute() {
        output
    } else {
        root.join(output)
    }
}

async fn report_events(mut events: ServeEvents, fatal: mpsc::Sender<CliError>) {
    while let Some(event) = events.recv().await {
        if let Some(error) = report_event(&event) {
            let _ = fatal.send(error).await;
            break;
        }
    }
}

/// Print one lifecycle event. Returns the error for fatal events.
fn report_event(event: &ServeEvent) -> Option<CliError> {
    match event {
        ServeEvent::Complete { stats } => {
            tracing::debug!(
                hash = %stats.hash,
                duration_ms = stats.duration_ms,
                "build cycle complete"
            );
            None
        }
        ServeEvent::Success {
            stats,
            is_first_compile,
            server_params,
            ..
        } => {
            ui::success(&format!(
                "Compiled successfully in {}",
                ui::format_duration_ms(stats.duration_ms)
            ));

            let warnings = stats.all_warnings();
            if !warnings.is_empty() {
                ui::warning(&format!("{} warning(s):", warnings.len()));
                for warning in warnings.iter().take(MAX_LISTED_WARNINGS) {
                    ui::warning(&format!("  - {}", warning.message));
                }
            }

            ui::print_asset_table(&stats.all_assets());

            if *is_first_compile {
                ui::info(&format!("App running at: {}", server_params.local_url()));
            }
            None
        }
        ServeEvent::Fail {
            error,
            error_type: ErrorType::Engine,
        } => {
            ui::error(&describe_build_error(error));
            None
        }
        ServeEvent::Fail {
            error,
            error_type: ErrorType::Run,
        } => Some(CliError::Startup(Arc::clone(error))),
    }
}

fn describe_build_error(error: &ServeError) -> String {
    match error {
        ServeError::EngineBuild(failure) => {
            let mut line = format!("Failed to compile: {}", failure);
            if let (Some(module), None) = (&failure.module, &failure.file) {
                line.push_str(&format!("\n  module: {}", module));
            }
            line
        }
        other => format!("Failed to compile: {}", other),
    }
}
