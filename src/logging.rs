//! Tracing subscriber setup
//!
//! Level comes from CLI verbosity (quiet → warn, normal → configured level,
//! -v → debug, -vv → trace). `RUST_LOG` overrides both.

use crate::cli::Verbosity;
use tracing_subscriber::EnvFilter;

/// Filter directive for a verbosity and the configured default level
pub fn level_for(verbosity: Verbosity, configured: &str) -> String {
    match verbosity {
        Verbosity::Quiet => "warn".to_string(),
        Verbosity::Normal => configured.to_ascii_lowercase(),
        Verbosity::Verbose => "debug".to_string(),
        Verbosity::VeryVerbose => "trace".to_string(),
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbosity: Verbosity, configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity, configured)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
