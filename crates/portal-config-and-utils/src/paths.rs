//! File system paths for portal tooling.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory under the user's home holding config, credentials and logs.
const BASE_DIR_NAME: &str = ".healthswift";

/// Where the portal keeps its files. Tests root it in a temp dir.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.healthswift`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or(CoreError::NoHomeDir)?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.healthswift).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.healthswift/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the persisted credentials file (~/.healthswift/credentials.json).
    pub fn credentials_file(&self) -> PathBuf {
        self.base_dir.join("credentials.json")
    }

    /// Get the logs directory (~/.healthswift/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file (~/.healthswift/logs/portal.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("portal.jsonl")
    }

    /// Ensure the base and logs directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_layout() {
        let paths = Paths::with_base_dir(PathBuf::from("/tmp/hs"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/hs/config.json"));
        assert_eq!(
            paths.credentials_file(),
            PathBuf::from("/tmp/hs/credentials.json")
        );
        assert_eq!(paths.log_file(), PathBuf::from("/tmp/hs/logs/portal.jsonl"));
    }

    #[test]
    fn test_ensure_dirs_creates_tree() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("hs"));
        paths.ensure_dirs().unwrap();
        assert!(paths.base_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }

    #[test]
    fn test_default_paths_end_with_base_dir_name() {
        if let Ok(paths) = Paths::new() {
            assert!(paths.base_dir().ends_with(BASE_DIR_NAME));
        }
    }
}
