//! Diagnostic logging.
//!
//! Logs go to stderr through `env_logger` so the console presenter keeps
//! stdout to itself. `RUST_LOG`, when set, takes precedence over the
//! configured level.

use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::config::LoggingConfig;

/// Map a configured level name to a filter. Unknown names mean `Info`.
pub fn level_filter(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

/// Install the global logger if logging is enabled.
///
/// Returns true if a logger was installed by this call.
pub fn init(config: &LoggingConfig) -> bool {
    if !config.enabled {
        return false;
    }

    let mut builder = Builder::new();
    builder
        .filter_level(level_filter(&config.level))
        .target(Target::Stderr)
        .format_timestamp(None);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.try_init().is_ok()
}
