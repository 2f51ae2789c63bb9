use tracing_subscriber::EnvFilter;

use crate::args::LogVerbosity;

/// Log to stderr; stdout is left to terraform. `RUST_LOG` overrides `verbosity`.
pub fn init(verbosity: LogVerbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn level_directive(verbosity: LogVerbosity) -> &'static str {
    match verbosity {
        LogVerbosity::Debug => "debug",
        LogVerbosity::Info => "info",
        LogVerbosity::Warning => "warn",
        // tracing has no level above error
        LogVerbosity::Error | LogVerbosity::Critical => "error",
    }
}
