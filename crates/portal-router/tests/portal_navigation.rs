use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use portal_auth::{
    AuthEvent, AuthEventKind, AuthResult, AuthSessionManager, Identity, IdentityProvider,
    MemoryRoleStore, ProviderSession, Role,
};
use portal_router::{
    login_redirect, GuardDecision, GuardedRoute, Navigation, Redirect, RouteTable,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Provider that accepts every sign-up and signs the new user in.
struct OpenProvider {
    events: broadcast::Sender<AuthEvent>,
    accounts: Mutex<Vec<String>>,
}

impl OpenProvider {
    fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            events,
            accounts: Mutex::new(Vec::new()),
        })
    }

    fn session_for(&self, email: &str) -> ProviderSession {
        let mut accounts = self.accounts.lock().unwrap();
        let index = match accounts.iter().position(|a| a == email) {
            Some(index) => index,
            None => {
                accounts.push(email.to_string());
                accounts.len() - 1
            }
        };
        ProviderSession {
            user: Identity::new(format!("user-{index}"), Some(email.to_string())),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        }
    }
}

#[async_trait]
impl IdentityProvider for OpenProvider {
    async fn sign_in(&self, email: &str, _password: &str) -> AuthResult<()> {
        let session = self.session_for(email);
        let _ = self.events.send(AuthEvent::new(AuthEventKind::SignedIn, Some(session)));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<()> {
        self.sign_in(email, password).await
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let _ = self.events.send(AuthEvent::new(AuthEventKind::SignedOut, None));
        Ok(())
    }

    async fn get_session(&self) -> AuthResult<Option<ProviderSession>> {
        Ok(None)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

async fn signed_in_manager(email: &str) -> AuthSessionManager {
    let manager = AuthSessionManager::start(OpenProvider::new(), Arc::new(MemoryRoleStore::new()));
    manager.wait_resolved().await;
    manager.sign_up(email, "secret1").await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        manager
            .store()
            .wait_until(|s| s.is_resolved() && s.is_authenticated()),
    )
    .await
    .expect("sign-up never resolved");
    manager
}

#[tokio::test]
async fn test_fresh_sign_up_is_sent_to_role_select() {
    let manager = signed_in_manager("new@x.com").await;
    let table = RouteTable::portal();

    let session = manager.session();
    assert_eq!(session.role, Some(Role::None));
    assert_eq!(
        table.navigate("/doctor", &session),
        Navigation::Redirect { to: "/role-select" }
    );
    assert_eq!(login_redirect(&session), Some("/role-select"));
}

#[tokio::test]
async fn test_role_pick_opens_role_pages() {
    let manager = signed_in_manager("lab@diag.in").await;
    let table = RouteTable::portal();

    manager.set_role(Role::DiagnosticCenter).await.unwrap();
    let session = manager.session();

    assert_eq!(
        table.navigate("/lab/bookings", &session),
        Navigation::Render { path: "/lab/bookings" }
    );
    assert_eq!(
        table.navigate("/physio", &session),
        Navigation::Redirect { to: "/role-select" }
    );
    assert_eq!(login_redirect(&session), Some("/lab"));
}

#[tokio::test]
async fn test_guarded_route_reacts_to_sign_out() {
    let manager = signed_in_manager("doc@clinic.in").await;
    manager.set_role(Role::Doctor).await.unwrap();

    let mut guard = GuardedRoute::new(manager.subscribe(), Some(Role::Doctor));
    assert_eq!(guard.decision(), GuardDecision::Render);

    manager.sign_out().await.unwrap();
    assert_eq!(
        guard.changed().await,
        Some(GuardDecision::Redirect(Redirect::SignIn))
    );
}
