//! Tracing setup for the `relmap` binary.
//!
//! The library only emits events; installing a subscriber is left to the
//! embedding application. The filter comes from `RELMAP_LOG` when set, then
//! from the config file's `[logging] filter`, then from the verbosity level.
//! Output goes to stderr so stdout stays clean for JSON results.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "RELMAP_LOG";

const DEFAULT_LOG_FILTER: &str = "relmap=warn";

/// Filter directive for a `-v` count.
pub fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => DEFAULT_LOG_FILTER,
        1 => "relmap=info",
        2 => "relmap=debug",
        _ => "relmap=trace",
    }
}

/// Build the effective filter.
pub fn build_filter(verbosity: u8, settings: &LoggingSettings) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    if verbosity == 0 {
        if let Some(directive) = &settings.filter {
            match EnvFilter::try_new(directive) {
                Ok(filter) => return filter,
                Err(e) => eprintln!("Warning: ignoring invalid log filter '{}': {}", directive, e),
            }
        }
    }
    EnvFilter::new(verbosity_filter(verbosity))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: u8, settings: &LoggingSettings) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbosity, settings))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
