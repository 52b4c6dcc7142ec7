//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;
use stoke_serve::ServeError;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Serve(e) => serve_error_to_miette(&e),
        CliError::Startup(e) => serve_error_to_miette(&e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert ServeError to miette Report
pub fn serve_error_to_miette(err: &ServeError) -> Report {
    match err {
        ServeError::EngineBuild(failure) => match failure.location() {
            Some(location) => miette::miette!(
                "Build failed ({}) in {}\n\n{}",
                failure.category,
                location,
                failure.message
            ),
            None => miette::miette!("Build failed ({}): {}", failure.category, failure.message),
        },
        ServeError::ServerStart { address, reason } => miette::miette!(
            "Failed to start dev server on {}: {}\n\nHint: Pick another port with --port",
            address,
            reason
        ),
        ServeError::NetworkResolution { host, port, reason } => miette::miette!(
            "Cannot use {}:{} for the dev server: {}\n\nHint: Check --host, or free up the port range",
            host,
            port,
            reason
        ),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoke_serve::{BuildFailure, ErrorCategory};

    #[test]
    fn test_build_failure_report_includes_location() {
        let failure = BuildFailure {
            message: "Unexpected token".to_string(),
            file: Some("src/app.js".into()),
            module: None,
            line: Some(3),
            column: Some(1),
            category: ErrorCategory::Syntax,
            error_count: 1,
        };
        let report = cli_error_to_miette(CliError::Serve(ServeError::EngineBuild(failure)));
        let text = report.to_string();
        assert!(text.contains("src/app.js:3:1"));
        assert!(text.contains("syntax error"));
    }

    #[test]
    fn test_server_start_report_has_hint() {
        let report = serve_error_to_miette(&ServeError::ServerStart {
            address: "0.0.0.0:8899".to_string(),
            reason: "address in use".to_string(),
        });
        assert!(report.to_string().contains("--port"));
    }
}
