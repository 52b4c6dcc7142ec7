//! Logging setup for the stoke CLI.
//!
//! Library crates only emit `tracing` events; this module installs the one
//! subscriber the binary uses.
//!
//! ```rust,no_run
//! use stoke_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("dev server starting");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used with `--verbose`.
pub const VERBOSE_FILTER: &str = "stoke_serve=debug,stoke_cli=debug";

/// Filter used with `--quiet`.
pub const QUIET_FILTER: &str = "stoke_serve=error,stoke_cli=error";

/// Filter used when neither flag nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "stoke_serve=info,stoke_cli=info";

/// Initialize the global tracing subscriber.
///
/// Level selection, in order:
/// 1. `--verbose`: debug for stoke crates
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG`
/// 4. info for stoke crates
///
/// Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = build_filter(verbose, quiet);

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Whether log output should be colored.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
