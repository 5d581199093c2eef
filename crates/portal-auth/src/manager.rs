//! Auth session manager: bridges identity-provider events into the session store.

use crate::credentials::{validate_sign_in, validate_sign_up};
use crate::provider::{AuthEventKind, IdentityProvider};
use crate::resolver::{RoleResolver, RoleStore};
use crate::store::SessionStore;
use crate::{AuthError, AuthResult, Identity, Role, Session};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Single source of truth for who is signed in and with what role.
///
/// Provider events are handled one at a time, in arrival order, by a
/// background task. Each event publishes `{identity, None, Loading}` and then
/// spawns the role lookup; the result is applied only if no later event,
/// sign-out or role write happened in between.
pub struct AuthSessionManager {
    provider: Arc<dyn IdentityProvider>,
    roles: Arc<dyn RoleStore>,
    resolver: RoleResolver,
    store: Arc<SessionStore>,
    event_task: JoinHandle<()>,
}

impl AuthSessionManager {
    /// Subscribe to `provider`, then restore its persisted session as the
    /// initial event. Must be called inside a tokio runtime.
    pub fn start(provider: Arc<dyn IdentityProvider>, roles: Arc<dyn RoleStore>) -> Self {
        let resolver = RoleResolver::new(roles.clone());
        let store = Arc::new(SessionStore::new());
        let events = provider.subscribe();

        let event_task = tokio::spawn(run_event_loop(
            provider.clone(),
            resolver.clone(),
            store.clone(),
            events,
        ));

        Self {
            provider,
            roles,
            resolver,
            store,
            event_task,
        }
    }

    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }

    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    /// Wait until the current event has been fully processed.
    pub async fn wait_resolved(&self) -> Session {
        self.store.wait_resolved().await
    }

    /// Resolves when the provider answers. The session update arrives
    /// separately through the provider's `SignedIn` event.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<()> {
        let email = validate_sign_in(email, password)?;
        self.provider.sign_in(&email, password).await.map_err(|e| {
            warn!(error = %e, "Sign-in failed");
            e
        })
    }

    /// Create an account. New accounts have no role.
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<()> {
        let email = validate_sign_up(email, password)?;
        self.provider.sign_up(&email, password).await.map_err(|e| {
            warn!(error = %e, "Sign-up failed");
            e
        })
    }

    /// Clear the local session, then ask the provider to revoke it.
    ///
    /// A provider failure is returned but the local session stays cleared.
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.store.clear();
        info!("Local session cleared");

        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "Provider sign-out failed after local clear");
            return Err(e);
        }
        Ok(())
    }

    /// Assign `role` to the signed-in identity.
    ///
    /// Fails with [`AuthError::Conflict`] if another writer stored a different
    /// role first; call [`refresh_role`](Self::refresh_role) to re-read it.
    pub async fn set_role(&self, role: Role) -> AuthResult<()> {
        if !role.is_assigned() {
            return Err(AuthError::InvalidRole(role));
        }

        let session = self.store.snapshot();
        let identity = session.identity.clone().ok_or(AuthError::Unauthenticated)?;

        let current = match (session.is_resolved(), session.role) {
            (true, Some(current)) => current,
            _ => self
                .resolver
                .resolve(&identity.id)
                .await
                .map_err(|e| AuthError::NetworkError(e.to_string()))?,
        };
        let expected = current.is_assigned().then_some(current);

        self.roles
            .compare_and_set(&identity.id, expected, role)
            .await
            .map_err(AuthError::from)?;

        if self.store.apply_role(&identity.id, role) {
            info!(user_id = %identity.id, role = %role, "Role assigned");
        } else {
            debug!(user_id = %identity.id, "Identity changed during role write");
        }
        Ok(())
    }

    /// Re-read the role for the signed-in identity and publish it.
    pub async fn refresh_role(&self) -> AuthResult<Role> {
        let identity = self
            .store
            .snapshot()
            .identity
            .ok_or(AuthError::Unauthenticated)?;
        let role = self
            .resolver
            .resolve(&identity.id)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;
        self.store.apply_role(&identity.id, role);
        Ok(role)
    }

    /// Stop consuming provider events.
    pub fn shutdown(&self) {
        self.event_task.abort();
    }
}

impl Drop for AuthSessionManager {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}

async fn run_event_loop(
    provider: Arc<dyn IdentityProvider>,
    resolver: RoleResolver,
    store: Arc<SessionStore>,
    mut events: broadcast::Receiver<crate::AuthEvent>,
) {
    restore(&*provider, &resolver, &store).await;

    loop {
        match events.recv().await {
            Ok(event) => {
                let identity = event.session.map(|s| s.user);
                handle_event(event.kind, identity, &resolver, &store);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Auth event stream lagged, re-reading session");
                restore(&*provider, &resolver, &store).await;
            }
            Err(RecvError::Closed) => {
                debug!("Auth event stream closed");
                break;
            }
        }
    }
}

async fn restore(provider: &dyn IdentityProvider, resolver: &RoleResolver, store: &Arc<SessionStore>) {
    let identity = match provider.get_session().await {
        Ok(session) => session.map(|s| s.user),
        Err(e) => {
            warn!(error = %e, "Session restore failed, continuing signed out");
            None
        }
    };
    handle_event(AuthEventKind::InitialSession, identity, resolver, store);
}

fn handle_event(
    kind: AuthEventKind,
    identity: Option<Identity>,
    resolver: &RoleResolver,
    store: &Arc<SessionStore>,
) {
    debug!(
        event = %kind,
        user_id = identity.as_ref().map(|i| i.id.as_str()).unwrap_or("-"),
        "Auth event"
    );

    let Some(tag) = store.begin_resolution(identity) else {
        return;
    };

    let resolver = resolver.clone();
    let store = store.clone();
    tokio::spawn(async move {
        let role = match resolver.resolve(tag.identity_id()).await {
            Ok(role) => role,
            Err(e) => {
                warn!(user_id = %tag.identity_id(), error = %e, "Role lookup failed, treating as no role");
                Role::None
            }
        };
        store.apply_resolution(&tag, role);
    });
}
