//! Persisted provider session.

use crate::{SecureStorage, StorageError, StorageKeys, StorageResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before expiry at which a token is already treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Who the stored tokens belong to and how long they last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupabaseSessionMeta {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
    /// Supabase project the tokens were issued by.
    pub project_ref: String,
}

impl SupabaseSessionMeta {
    /// True once `now` is inside the refresh skew window.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(EXPIRY_SKEW_SECS)
    }
}

/// Everything needed to rebuild a signed-in session offline.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    pub meta: SupabaseSessionMeta,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("meta", &self.meta)
            .finish()
    }
}

/// Reads and writes the provider session through a [`SecureStorage`] backend.
pub struct SecretsManager {
    storage: Box<dyn SecureStorage>,
}

impl SecretsManager {
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    pub fn get_supabase_access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::SUPABASE_ACCESS_TOKEN)
    }

    fn session_meta(&self) -> StorageResult<Option<SupabaseSessionMeta>> {
        self.storage
            .get(StorageKeys::SUPABASE_SESSION_META)?
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| StorageError::Encoding(e.to_string()))
            })
            .transpose()
    }

    /// The stored session, if all of its parts are present.
    pub fn load_supabase_session(&self) -> StorageResult<Option<StoredSession>> {
        let access_token = self.storage.get(StorageKeys::SUPABASE_ACCESS_TOKEN)?;
        let refresh_token = self.storage.get(StorageKeys::SUPABASE_REFRESH_TOKEN)?;
        let meta = self.session_meta()?;
        Ok(match (access_token, refresh_token, meta) {
            (Some(access_token), Some(refresh_token), Some(meta)) => Some(StoredSession {
                access_token,
                refresh_token,
                meta,
            }),
            _ => None,
        })
    }

    /// Whether an access token and its metadata are stored.
    pub fn has_supabase_session(&self) -> StorageResult<bool> {
        Ok(self.storage.has(StorageKeys::SUPABASE_ACCESS_TOKEN)?
            && self.storage.has(StorageKeys::SUPABASE_SESSION_META)?)
    }

    /// Whether the stored access token needs refreshing. A missing session
    /// counts as expired.
    pub fn is_supabase_session_expired(&self) -> StorageResult<bool> {
        Ok(self
            .session_meta()?
            .map_or(true, |meta| meta.is_expired_at(Utc::now())))
    }

    /// Replace the stored session.
    pub fn set_supabase_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        meta: &SupabaseSessionMeta,
    ) -> StorageResult<()> {
        let meta_json =
            serde_json::to_string(meta).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage
            .set(StorageKeys::SUPABASE_ACCESS_TOKEN, access_token)?;
        self.storage
            .set(StorageKeys::SUPABASE_REFRESH_TOKEN, refresh_token)?;
        self.storage
            .set(StorageKeys::SUPABASE_SESSION_META, &meta_json)
    }

    /// Forget the stored session. Keys that fail to delete are logged and
    /// skipped.
    pub fn clear_supabase_session(&self) -> StorageResult<()> {
        for key in StorageKeys::ALL {
            if let Err(e) = self.storage.delete(key) {
                tracing::warn!(key, error = %e, "Failed to delete stored credential");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn meta(user_id: &str, expires_in: Duration) -> SupabaseSessionMeta {
        SupabaseSessionMeta {
            user_id: user_id.to_string(),
            email: Some("doc@clinic.in".to_string()),
            expires_at: Utc::now() + expires_in,
            project_ref: "default".to_string(),
        }
    }

    #[test]
    fn test_session_lifecycle() {
        let manager = SecretsManager::new(Box::new(MemoryStorage::new()));
        assert!(!manager.has_supabase_session().unwrap());
        assert!(manager.load_supabase_session().unwrap().is_none());

        manager
            .set_supabase_session("access", "refresh", &meta("user-1", Duration::hours(1)))
            .unwrap();

        assert!(manager.has_supabase_session().unwrap());
        assert!(!manager.is_supabase_session_expired().unwrap());
        let stored = manager.load_supabase_session().unwrap().unwrap();
        assert_eq!(stored.refresh_token, "refresh");
        assert_eq!(stored.meta.user_id, "user-1");

        manager.clear_supabase_session().unwrap();
        assert!(!manager.has_supabase_session().unwrap());
        assert!(manager.get_supabase_access_token().unwrap().is_none());
    }

    #[test]
    fn test_session_expiry_window() {
        let manager = SecretsManager::new(Box::new(MemoryStorage::new()));
        assert!(manager.is_supabase_session_expired().unwrap());

        manager
            .set_supabase_session("a", "r", &meta("user-1", -Duration::hours(1)))
            .unwrap();
        assert!(manager.is_supabase_session_expired().unwrap());

        // Inside the skew window counts as expired.
        manager
            .set_supabase_session("a", "r", &meta("user-1", Duration::seconds(30)))
            .unwrap();
        assert!(manager.is_supabase_session_expired().unwrap());
    }

    #[test]
    fn test_partial_session_is_not_loaded() {
        let storage = MemoryStorage::new();
        storage
            .set(StorageKeys::SUPABASE_ACCESS_TOKEN, "orphaned")
            .unwrap();
        let manager = SecretsManager::new(Box::new(storage));
        assert!(manager.load_supabase_session().unwrap().is_none());
        assert!(!manager.has_supabase_session().unwrap());
    }

    #[test]
    fn test_meta_missing_email_defaults_to_none() {
        let storage = MemoryStorage::new();
        storage
            .set(
                StorageKeys::SUPABASE_SESSION_META,
                r#"{"user_id":"u","expires_at":"2030-01-01T00:00:00Z","project_ref":"p"}"#,
            )
            .unwrap();
        let manager = SecretsManager::new(Box::new(storage));
        assert!(!manager.is_supabase_session_expired().unwrap());
    }

    #[test]
    fn test_corrupt_meta_is_encoding_error() {
        let storage = MemoryStorage::new();
        storage
            .set(StorageKeys::SUPABASE_SESSION_META, r#"{"user_id":"u","expires_at":"yesterday"}"#)
            .unwrap();
        let manager = SecretsManager::new(Box::new(storage));
        assert!(matches!(
            manager.is_supabase_session_expired(),
            Err(StorageError::Encoding(_))
        ));
    }

    #[test]
    fn test_stored_session_debug_hides_tokens() {
        let stored = StoredSession {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            meta: meta("user-1", Duration::hours(1)),
        };
        let debug = format!("{stored:?}");
        assert!(!debug.contains("secret-"));
        assert!(debug.contains("user-1"));
    }
}
