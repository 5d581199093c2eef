//! CLI command implementations.

pub mod auth;
pub mod portal;

use anyhow::{anyhow, Context, Result};
use portal_auth::{
    AuthError, AuthSessionManager, ErrorPresentation, Role, Session, SupabaseAuthProvider,
    SupabaseRoleStore,
};
use portal_config_and_utils::{Config, Paths};
use portal_router::{login_redirect, RouteTable};
use portal_storage::{create_secrets_manager, MemoryStorage, SecretsManager};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound for restoring or resolving a session.
const SESSION_TIMEOUT: Duration = Duration::from_secs(15);

/// Live session plus the route table, shared by all commands.
pub struct Portal {
    pub manager: AuthSessionManager,
    pub routes: RouteTable,
}

impl Portal {
    /// Build the Supabase-backed session manager and start restoring.
    ///
    /// With `ephemeral` the credentials live in memory only and are gone
    /// when the process exits.
    pub fn connect(config: &Config, paths: &Paths, ephemeral: bool) -> Result<Self> {
        config.validate()?;
        let supabase_url = config.supabase_url()?;

        let secrets = if ephemeral {
            SecretsManager::new(Box::new(MemoryStorage::new()))
        } else {
            paths.ensure_dirs()?;
            create_secrets_manager(paths)
        };

        debug!(supabase_url = %supabase_url, ephemeral, "Starting session manager");
        Ok(Self::with_secrets(
            Arc::new(secrets),
            supabase_url.as_str(),
            &config.supabase_publishable_key,
        ))
    }

    fn with_secrets(
        secrets: Arc<SecretsManager>,
        supabase_url: &str,
        publishable_key: &str,
    ) -> Self {
        let provider = Arc::new(SupabaseAuthProvider::new(secrets, supabase_url, publishable_key));
        let roles = Arc::new(SupabaseRoleStore::new(
            supabase_url,
            publishable_key,
            provider.clone(),
        ));

        Self {
            manager: AuthSessionManager::start(provider, roles),
            routes: RouteTable::portal(),
        }
    }

    /// Current session once resolved.
    pub async fn resolved(&self) -> Result<Session> {
        tokio::time::timeout(SESSION_TIMEOUT, self.manager.wait_resolved())
            .await
            .context("Timed out waiting for the session to load")
    }

    /// First resolved session with a signed-in identity.
    pub async fn signed_in(&self) -> Result<Session> {
        let store = self.manager.store();
        tokio::time::timeout(
            SESSION_TIMEOUT,
            store.wait_until(|s| s.is_resolved() && s.is_authenticated()),
        )
        .await
        .context("Timed out waiting for the sign-in to resolve")
    }
}

/// Session summary printed by most commands.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub signed_in: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    /// Where the sign-in page would send this session.
    pub home: Option<&'static str>,
}

impl From<&Session> for SessionReport {
    fn from(session: &Session) -> Self {
        let identity = session.identity.as_ref();
        Self {
            signed_in: session.is_authenticated(),
            user_id: identity.map(|i| i.id.clone()),
            email: identity.and_then(|i| i.email.clone()),
            role: session.role,
            home: login_redirect(session),
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.signed_in {
            return write!(f, "Not signed in");
        }
        let role = self
            .role
            .map(|r| r.display_name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        writeln!(f, "{}", crate::output::row("Email", self.email.as_deref().unwrap_or("-")))?;
        writeln!(f, "{}", crate::output::row("User ID", self.user_id.as_deref().unwrap_or("-")))?;
        writeln!(f, "{}", crate::output::row("Role", &role))?;
        write!(f, "{}", crate::output::row("Home", self.home.unwrap_or("-")))
    }
}

/// Turn an auth failure into a user-facing error.
pub fn auth_failure(err: AuthError) -> anyhow::Error {
    match err.presentation() {
        ErrorPresentation::InlineFormError | ErrorPresentation::Generic => anyhow!(err),
        ErrorPresentation::RetryPrompt => {
            anyhow!("{err}. Check your connection and try again")
        }
        ErrorPresentation::SilentRedirect => {
            anyhow!("Not signed in. Run 'healthswift login' first")
        }
    }
}
