//! # Observability
//!
//! Centralized logging setup for the portal crates.
//!
//! Crates are **log producers** only. They use the standard `tracing` macros and
//! know nothing about where the output goes. The binary calls
//! [`init_with_config`] once at startup, which installs:
//!
//! - a JSONL file layer at `~/.healthswift/logs/portal.jsonl` (one object per line),
//! - an optional compact stderr layer for interactive use,
//! - an `EnvFilter` driven by `RUST_LOG`, falling back to the configured level.
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "cli".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Directory name under the home directory shared by all portal tooling.
const HOME_DIR_NAME: &str = ".healthswift";
/// Log file name inside the logs directory.
const LOG_FILE_NAME: &str = "portal.jsonl";

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g. "cli"). Written once at startup so log
    /// readers can tell processes apart.
    pub service_name: String,

    /// Default log level filter (e.g. "debug", "info", "warn").
    /// Overridden by the `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.healthswift/logs/portal.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Write JSONL to the log file. Disabled in tests that only want stderr.
    pub write_file: bool,

    /// Also emit human-readable logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            write_file: true,
            also_stderr: false,
        }
    }
}

impl LogConfig {
    /// Resolve the log file path, falling back to the default location.
    ///
    /// Returns `None` when no explicit path is set and the home directory
    /// cannot be determined.
    pub fn resolved_log_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.log_path {
            return Some(path.clone());
        }
        dirs::home_dir().map(|home| home.join(HOME_DIR_NAME).join("logs").join(LOG_FILE_NAME))
    }
}

/// Initialize logging with custom configuration.
///
/// Calling this more than once is harmless: later calls leave the first
/// subscriber in place. A log file that cannot be opened disables the file
/// layer rather than aborting the process.
pub fn init_with_config(config: LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let file_layer = if config.write_file {
        match config.resolved_log_path().map(|path| open_log_file(&path)) {
            Some(Ok(file)) => Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false)
                    .with_writer(Mutex::new(file)),
            ),
            Some(Err(e)) => {
                eprintln!("observability: log file unavailable, file logging disabled: {e}");
                None
            }
            None => None,
        }
    } else {
        None
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(service = %config.service_name, pid = std::process::id(), "logging initialized");
    }
}

/// Open the log file for appending, creating parent directories as needed.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.write_file);
        assert!(!config.also_stderr);
    }

    #[test]
    fn test_explicit_log_path_wins() {
        let config = LogConfig {
            log_path: Some(PathBuf::from("/tmp/custom.jsonl")),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_log_path(),
            Some(PathBuf::from("/tmp/custom.jsonl"))
        );
    }

    #[test]
    fn test_default_log_path_under_home() {
        let config = LogConfig::default();
        if let Some(path) = config.resolved_log_path() {
            assert!(path.ends_with(".healthswift/logs/portal.jsonl"));
        }
    }

    #[test]
    fn test_open_log_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("portal.jsonl");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            service_name: "test".into(),
            log_path: Some(dir.path().join("portal.jsonl")),
            ..Default::default()
        };
        init_with_config(config.clone());
        init_with_config(config);
    }
}
