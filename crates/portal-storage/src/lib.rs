//! Credential storage for the portal.
//!
//! The identity provider persists its session through [`SecretsManager`] so a
//! signed-in user stays signed in across process restarts. Backends:
//! - [`FileStorage`]: JSON file under `~/.healthswift`, owner-only permissions
//! - [`MemoryStorage`]: volatile, for tests and ephemeral runs

mod file;
mod keys;
mod memory;
mod secrets;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use secrets::{SecretsManager, StoredSession, SupabaseSessionMeta};
pub use traits::SecureStorage;

use portal_config_and_utils::Paths;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Stored data could not be parsed or serialized
    #[error("Corrupt credential data: {0}")]
    Encoding(String),

    #[error("Credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default file-backed storage at the configured credentials path.
pub fn create_storage(paths: &Paths) -> Box<dyn SecureStorage> {
    Box::new(FileStorage::new(paths.credentials_file()))
}

/// Create a SecretsManager with the default file storage.
pub fn create_secrets_manager(paths: &Paths) -> SecretsManager {
    SecretsManager::new(create_storage(paths))
}
