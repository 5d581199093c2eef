//! Logging initialization.
//!
//! Thin wrapper over the observability crate: portal processes write
//! structured JSONL to [`Paths::log_file`].

use crate::Paths;
use observability::LogConfig;

/// Initialize logging for the CLI.
///
/// `RUST_LOG` wins over `level` when set. Stderr output is enabled when
/// `HEALTHSWIFT_LOG_STDERR` is set to a truthy value.
pub fn init_logging(paths: &Paths, level: &str) {
    let also_stderr = std::env::var("HEALTHSWIFT_LOG_STDERR")
        .ok()
        .map(|raw| is_truthy(&raw))
        .unwrap_or(false);

    observability::init_with_config(LogConfig {
        service_name: "cli".into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr,
        ..Default::default()
    });
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
