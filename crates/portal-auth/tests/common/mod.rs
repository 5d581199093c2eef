#![allow(dead_code)]

pub mod http;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use portal_auth::{
    AuthError, AuthEvent, AuthEventKind, AuthResult, AuthSessionManager, Identity,
    IdentityProvider, MemoryRoleStore, ProviderSession, Role, RoleStore, RoleStoreError, Session,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

/// How long scenario tests wait for the session to settle.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn provider_session(id: &str, email: &str) -> ProviderSession {
    ProviderSession {
        user: Identity::new(id, Some(email.to_string())),
        access_token: format!("access-{id}"),
        refresh_token: format!("refresh-{id}"),
        expires_at: Utc::now() + ChronoDuration::hours(1),
    }
}

struct Account {
    id: String,
    password: String,
}

/// Scripted identity provider with an in-memory account table.
pub struct MockIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<ProviderSession>>,
    events: broadcast::Sender<AuthEvent>,
    next_id: AtomicUsize,
    offline: AtomicBool,
    require_confirmation: AtomicBool,
    fail_sign_out: AtomicBool,
    calls: AtomicUsize,
    session_reads: AtomicUsize,
}

impl MockIdentityProvider {
    pub fn new() -> Arc<Self> {
        Self::with_event_capacity(64)
    }

    /// Provider whose event channel holds only `capacity` undelivered events.
    pub fn with_event_capacity(capacity: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(capacity);
        Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            events,
            next_id: AtomicUsize::new(1),
            offline: AtomicBool::new(false),
            require_confirmation: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            session_reads: AtomicUsize::new(0),
        })
    }

    /// Register an account and return its id.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let id = format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.accounts.lock().insert(
            email.to_string(),
            Account {
                id: id.clone(),
                password: password.to_string(),
            },
        );
        id
    }

    /// Make `get_session` return a session for `email`, as if persisted.
    pub fn persist_session_for(&self, email: &str) {
        let accounts = self.accounts.lock();
        let account = accounts.get(email).expect("unknown account");
        *self.current.lock() = Some(provider_session(&account.id, email));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_require_confirmation(&self, required: bool) {
        self.require_confirmation.store(required, Ordering::SeqCst);
    }

    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Number of provider operations invoked (get_session excluded).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `get_session` calls.
    pub fn session_reads(&self) -> usize {
        self.session_reads.load(Ordering::SeqCst)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().len()
    }

    /// Push an event as if the provider produced it on its own.
    pub fn emit(&self, kind: AuthEventKind, session: Option<ProviderSession>) {
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    fn check_online(&self) -> AuthResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::NetworkError("provider unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let session = {
            let accounts = self.accounts.lock();
            match accounts.get(email) {
                Some(account) if account.password == password => {
                    provider_session(&account.id, email)
                }
                _ => {
                    return Err(AuthError::InvalidCredentials(
                        "Invalid login credentials".to_string(),
                    ))
                }
            }
        };
        *self.current.lock() = Some(session.clone());
        self.emit(AuthEventKind::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.accounts.lock().contains_key(email) {
            return Err(AuthError::EmailTaken("User already registered".to_string()));
        }
        let id = self.add_account(email, password);
        if self.require_confirmation.load(Ordering::SeqCst) {
            return Ok(());
        }
        let session = provider_session(&id, email);
        *self.current.lock() = Some(session.clone());
        self.emit(AuthEventKind::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.current.lock() = None;
        self.emit(AuthEventKind::SignedOut, None);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::NetworkError("revoke failed".to_string()));
        }
        Ok(())
    }

    async fn get_session(&self) -> AuthResult<Option<ProviderSession>> {
        self.session_reads.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.current.lock().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// Role store whose reads for selected identities block until released.
pub struct GatedRoleStore {
    inner: MemoryRoleStore,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    completed_reads: Mutex<Vec<String>>,
}

impl GatedRoleStore {
    pub fn new(inner: MemoryRoleStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gates: Mutex::new(HashMap::new()),
            completed_reads: Mutex::new(Vec::new()),
        })
    }

    pub fn hold(&self, identity_id: &str) {
        self.gates
            .lock()
            .insert(identity_id.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, identity_id: &str) {
        if let Some(gate) = self.gates.lock().remove(identity_id) {
            gate.notify_one();
        }
    }

    pub fn completed_reads(&self, identity_id: &str) -> usize {
        self.completed_reads
            .lock()
            .iter()
            .filter(|id| id.as_str() == identity_id)
            .count()
    }
}

#[async_trait]
impl RoleStore for GatedRoleStore {
    async fn read(&self, identity_id: &str) -> Result<Option<Role>, RoleStoreError> {
        let gate = self.gates.lock().get(identity_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let role = self.inner.read(identity_id).await;
        self.completed_reads.lock().push(identity_id.to_string());
        role
    }

    async fn compare_and_set(
        &self,
        identity_id: &str,
        expected: Option<Role>,
        new: Role,
    ) -> Result<(), RoleStoreError> {
        self.inner.compare_and_set(identity_id, expected, new).await
    }
}

/// Role store that is always unreachable.
pub struct UnavailableRoleStore;

#[async_trait]
impl RoleStore for UnavailableRoleStore {
    async fn read(&self, _identity_id: &str) -> Result<Option<Role>, RoleStoreError> {
        Err(RoleStoreError::Unavailable("connection refused".to_string()))
    }

    async fn compare_and_set(
        &self,
        _identity_id: &str,
        _expected: Option<Role>,
        _new: Role,
    ) -> Result<(), RoleStoreError> {
        Err(RoleStoreError::Unavailable("connection refused".to_string()))
    }
}

/// Wait until the manager's session satisfies `predicate`.
pub async fn settle(
    manager: &AuthSessionManager,
    predicate: impl FnMut(&Session) -> bool,
) -> Session {
    let store = manager.store();
    tokio::time::timeout(SETTLE_TIMEOUT, store.wait_until(predicate))
        .await
        .expect("session did not settle")
}

/// Wait until the session is resolved for `identity_id` (or signed out if `None`).
pub async fn settle_on(manager: &AuthSessionManager, identity_id: Option<&str>) -> Session {
    let expected = identity_id.map(str::to_string);
    settle(manager, move |s| {
        s.is_resolved() && s.identity_id().map(str::to_string) == expected
    })
    .await
}
