//! Identity provider seam.

use crate::{AuthResult, Identity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;

/// Kind of auth-state change reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    InitialSession,
}

impl AuthEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEventKind::SignedIn => "SIGNED_IN",
            AuthEventKind::SignedOut => "SIGNED_OUT",
            AuthEventKind::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEventKind::InitialSession => "INITIAL_SESSION",
        }
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential-bearing session held by the provider.
#[derive(Clone)]
pub struct ProviderSession {
    pub user: Identity,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSession")
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<ProviderSession>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<ProviderSession>) -> Self {
        Self { kind, session }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// External identity provider.
///
/// Credential persistence belongs to the provider. Successful operations are
/// reported twice: through the returned `Result` and as an [`AuthEvent`] on
/// the stream returned by [`subscribe`](IdentityProvider::subscribe).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<()>;

    /// Create an account. The provider emits `SignedIn` only if it issued a
    /// session immediately.
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<()>;

    async fn sign_out(&self) -> AuthResult<()>;

    /// Restore the persisted session, if any.
    async fn get_session(&self) -> AuthResult<Option<ProviderSession>>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names() {
        assert_eq!(AuthEventKind::SignedIn.to_string(), "SIGNED_IN");
        assert_eq!(AuthEventKind::InitialSession.to_string(), "INITIAL_SESSION");
        assert_eq!(
            serde_json::to_string(&AuthEventKind::TokenRefreshed).unwrap(),
            "\"TOKEN_REFRESHED\""
        );
    }

    #[test]
    fn test_provider_session_debug_redacts_tokens() {
        let session = ProviderSession {
            user: Identity::new("u-1", None),
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_at: Utc::now(),
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("u-1"));
    }
}
