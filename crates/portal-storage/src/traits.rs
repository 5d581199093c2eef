//! Backend seam for credential storage.

use crate::StorageResult;

/// String key/value store for credentials.
///
/// Backends are shared across tasks, so every method takes `&self`.
pub trait SecureStorage: Send + Sync {
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove `key`. Returns whether it was present.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    fn has(&self, key: &str) -> StorageResult<bool> {
        self.get(key).map(|value| value.is_some())
    }
}
