//! GoTrue-backed identity provider with persisted, refreshable sessions.

use super::{classify, project_ref_from_supabase_url, summarize_response_body, AccessTokenSource, AuthOp};
use crate::auth_fsm::{CredentialInput, CredentialMachine, CredentialState, RefreshConfig};
use crate::provider::{AuthEvent, AuthEventKind, IdentityProvider, ProviderSession};
use crate::{AuthError, AuthResult, Identity};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use portal_storage::{SecretsManager, SupabaseSessionMeta};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Identity::new(user.id, user.email)
    }
}

/// Session issued by the token and sign-up endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserResponse,
}

/// Sign-up answers with a session, or with only the user while the email
/// address awaits confirmation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    PendingConfirmation(UserResponse),
}

/// Identity provider talking to Supabase Auth (GoTrue).
///
/// Provider operations are serialized; the credential FSM tracks which one is
/// in flight. Sessions are persisted through [`SecretsManager`].
pub struct SupabaseAuthProvider {
    secrets: Arc<SecretsManager>,
    supabase_url: String,
    publishable_key: String,
    project_ref: String,
    http_client: Client,
    fsm: Mutex<CredentialMachine>,
    ops: tokio::sync::Mutex<()>,
    refresh_config: RefreshConfig,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseAuthProvider {
    pub fn new(secrets: Arc<SecretsManager>, supabase_url: &str, publishable_key: &str) -> Self {
        Self::with_refresh_config(secrets, supabase_url, publishable_key, RefreshConfig::default())
    }

    pub fn with_refresh_config(
        secrets: Arc<SecretsManager>,
        supabase_url: &str,
        publishable_key: &str,
        refresh_config: RefreshConfig,
    ) -> Self {
        let supabase_url = supabase_url.trim_end_matches('/').to_string();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            secrets,
            project_ref: project_ref_from_supabase_url(&supabase_url),
            supabase_url,
            publishable_key: publishable_key.to_string(),
            http_client: Client::new(),
            fsm: Mutex::new(CredentialMachine::new()),
            ops: tokio::sync::Mutex::new(()),
            refresh_config,
            events,
        }
    }

    pub fn credential_state(&self) -> CredentialState {
        CredentialState::from(self.fsm.lock().state())
    }

    fn transition(&self, input: &CredentialInput) -> AuthResult<CredentialState> {
        let mut fsm = self.fsm.lock();
        let old_state = CredentialState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = CredentialState::from(fsm.state());
        if old_state != new_state {
            debug!(old_state = ?old_state, new_state = ?new_state, "Credential state transition");
        }
        Ok(new_state)
    }

    fn emit(&self, kind: AuthEventKind, session: Option<ProviderSession>) {
        if self.events.send(AuthEvent::new(kind, session)).is_err() {
            debug!(event = %kind, "No auth event subscribers");
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.supabase_url, path)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> AuthResult<Response> {
        let response = self
            .http_client
            .post(self.auth_url(path))
            .header("apikey", &self.publishable_key)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    /// Fail with the classified error unless `response` is a success.
    async fn check(op: AuthOp, response: Response) -> AuthResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(
            status = %status,
            body_summary = %summarize_response_body(&body),
            op = ?op,
            "Supabase auth request failed"
        );
        Err(classify(op, status, &body))
    }

    /// Persist a freshly issued session and return it.
    fn store_session(&self, data: TokenResponse) -> AuthResult<ProviderSession> {
        let expires_at = Utc::now() + Duration::seconds(data.expires_in);
        let user: Identity = data.user.into();
        self.secrets.set_supabase_session(
            &data.access_token,
            &data.refresh_token,
            &SupabaseSessionMeta {
                user_id: user.id.clone(),
                email: user.email.clone(),
                expires_at,
                project_ref: self.project_ref.clone(),
            },
        )?;
        Ok(ProviderSession {
            user,
            access_token: data.access_token,
            refresh_token: data.refresh_token,
            expires_at,
        })
    }

    /// Rebuild the persisted session without contacting the server.
    fn stored_session(&self) -> AuthResult<Option<ProviderSession>> {
        Ok(self.secrets.load_supabase_session()?.map(|stored| ProviderSession {
            user: Identity::new(stored.meta.user_id, stored.meta.email),
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at: stored.meta.expires_at,
        }))
    }

    async fn request_sign_in(&self, email: &str, password: &str) -> AuthResult<ProviderSession> {
        let response = self
            .post_json("token?grant_type=password", &PasswordRequest { email, password })
            .await?;
        let data: TokenResponse = Self::check(AuthOp::SignIn, response).await?.json().await?;
        self.store_session(data)
    }

    async fn request_sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<Option<ProviderSession>> {
        let response = self
            .post_json("signup", &PasswordRequest { email, password })
            .await?;
        match Self::check(AuthOp::SignUp, response)
            .await?
            .json::<SignUpResponse>()
            .await?
        {
            SignUpResponse::Session(data) => Ok(Some(self.store_session(data)?)),
            SignUpResponse::PendingConfirmation(user) => {
                info!(user_id = %user.id, "Sign-up awaiting email confirmation");
                Ok(None)
            }
        }
    }

    async fn verify_with_server(&self, access_token: &str) -> AuthResult<Identity> {
        let response = self
            .http_client
            .get(self.auth_url("user"))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;
        let user: UserResponse = Self::check(AuthOp::Verify, response).await?.json().await?;
        Ok(user.into())
    }

    async fn revoke(&self, access_token: &str) -> AuthResult<()> {
        let response = self
            .http_client
            .post(self.auth_url("logout"))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;
        match Self::check(AuthOp::SignOut, response).await {
            Ok(_) => Ok(()),
            // Token already invalid server-side
            Err(AuthError::Unauthenticated) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn try_refresh(&self, refresh_token: &str) -> AuthResult<ProviderSession> {
        debug!("Refreshing access token");
        let response = self
            .post_json("token?grant_type=refresh_token", &RefreshRequest { refresh_token })
            .await?;
        let data: TokenResponse = Self::check(AuthOp::Refresh, response).await?.json().await?;
        let session = self.store_session(data)?;
        info!(user_id = %session.user.id, "Token refreshed");
        Ok(session)
    }

    /// Refresh with exponential backoff on transient failures.
    ///
    /// A rejected refresh token clears the stored session. Exhausting retries
    /// keeps it for a later attempt.
    async fn refresh_with_backoff(&self, refresh_token: &str) -> AuthResult<ProviderSession> {
        let mut last_error = None;

        for attempt in 0..self.refresh_config.max_retries {
            match self.try_refresh(refresh_token).await {
                Ok(session) => {
                    self.transition(&CredentialInput::RefreshSuccess)?;
                    return Ok(session);
                }
                Err(e) if e.is_transient() => {
                    last_error = Some(e);
                    if attempt + 1 < self.refresh_config.max_retries {
                        self.transition(&CredentialInput::RefreshRetry)?;
                        let delay = self.refresh_config.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries = self.refresh_config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Refresh failed with transient error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Refresh rejected, clearing session");
                    self.secrets.clear_supabase_session()?;
                    self.transition(&CredentialInput::RefreshFailed)?;
                    return Err(e);
                }
            }
        }

        warn!(
            attempts = self.refresh_config.max_retries,
            "Refresh retries exhausted, keeping stored session"
        );
        self.transition(&CredentialInput::RefreshFailed)?;
        Err(last_error.unwrap_or_else(|| AuthError::NetworkError("refresh not attempted".into())))
    }

    /// The stored session and whether it needs a refresh. Incomplete
    /// sessions are cleared and reported as absent.
    fn load_for_restore(&self) -> AuthResult<Option<(ProviderSession, bool)>> {
        let Some(stored) = self.stored_session()? else {
            if self.secrets.has_supabase_session()? {
                info!("Stored session incomplete, clearing");
                self.secrets.clear_supabase_session()?;
            } else {
                debug!("No stored session");
            }
            return Ok(None);
        };
        let expired = self.secrets.is_supabase_session_expired()?;
        Ok(Some((stored, expired)))
    }

    async fn restore_locked(&self) -> AuthResult<Option<ProviderSession>> {
        self.transition(&CredentialInput::RestoreAttempt)?;

        // Anything unreadable is dropped so the machine always leaves Restoring.
        let loaded = match self.load_for_restore() {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Stored session unreadable, clearing");
                if let Err(e) = self.secrets.clear_supabase_session() {
                    warn!(error = %e, "Failed to clear unreadable session");
                }
                None
            }
        };
        let Some((stored, expired)) = loaded else {
            self.transition(&CredentialInput::NoSession)?;
            return Ok(None);
        };

        if expired {
            info!(user_id = %stored.user.id, "Stored session expired, refreshing");
            self.transition(&CredentialInput::SessionExpired)?;
            return self.refresh_with_backoff(&stored.refresh_token).await.map(Some);
        }

        self.transition(&CredentialInput::TokenNotExpired)?;
        match self.verify_with_server(&stored.access_token).await {
            Ok(user) => {
                info!(user_id = %user.id, "Stored session verified");
                self.transition(&CredentialInput::ServerVerified)?;
                Ok(Some(ProviderSession { user, ..stored }))
            }
            Err(e) if e.is_transient() => {
                warn!(user_id = %stored.user.id, error = %e, "Could not verify session, keeping it");
                self.transition(&CredentialInput::ServerUnreachable)?;
                Ok(Some(stored))
            }
            Err(e) => {
                warn!(user_id = %stored.user.id, error = %e, "Stored session rejected, clearing");
                self.secrets.clear_supabase_session()?;
                self.transition(&CredentialInput::ServerRejected)?;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<()> {
        let _op = self.ops.lock().await;
        self.transition(&CredentialInput::SignInAttempt)?;
        debug!(email = %email, "Signing in with password");

        match self.request_sign_in(email, password).await {
            Ok(session) => {
                self.transition(&CredentialInput::SignInSuccess)?;
                info!(user_id = %session.user.id, "Signed in");
                self.emit(AuthEventKind::SignedIn, Some(session));
                Ok(())
            }
            Err(e) => {
                self.transition(&CredentialInput::SignInFailed)?;
                Err(e)
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<()> {
        let _op = self.ops.lock().await;
        self.transition(&CredentialInput::SignUpAttempt)?;
        debug!(email = %email, "Signing up");

        match self.request_sign_up(email, password).await {
            Ok(Some(session)) => {
                self.transition(&CredentialInput::SignUpWithSession)?;
                info!(user_id = %session.user.id, "Signed up");
                self.emit(AuthEventKind::SignedIn, Some(session));
                Ok(())
            }
            Ok(None) => {
                self.transition(&CredentialInput::SignUpPendingConfirmation)?;
                Ok(())
            }
            Err(e) => {
                self.transition(&CredentialInput::SignUpFailed)?;
                Err(e)
            }
        }
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let _op = self.ops.lock().await;
        if let Err(e) = self.transition(&CredentialInput::SignOutRequested) {
            debug!(error = %e, "Sign-out outside a settled state");
        }

        let access_token = self.secrets.get_supabase_access_token()?;
        self.secrets.clear_supabase_session()?;
        if let Err(e) = self.transition(&CredentialInput::SignOutComplete) {
            debug!(error = %e, "Resetting credential state after sign-out");
            *self.fsm.lock() = CredentialMachine::new();
        }
        info!("Signed out");
        self.emit(AuthEventKind::SignedOut, None);

        match access_token {
            Some(token) => self.revoke(&token).await,
            None => Ok(()),
        }
    }

    async fn get_session(&self) -> AuthResult<Option<ProviderSession>> {
        let _op = self.ops.lock().await;
        self.restore_locked().await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl AccessTokenSource for SupabaseAuthProvider {
    /// Stored access token, refreshed first if it is about to expire.
    async fn access_token(&self) -> AuthResult<String> {
        if !self.secrets.is_supabase_session_expired()? {
            if let Some(token) = self.secrets.get_supabase_access_token()? {
                return Ok(token);
            }
        }

        let _op = self.ops.lock().await;
        // Another caller may have refreshed while we waited.
        let stored = self.stored_session()?.ok_or(AuthError::Unauthenticated)?;
        if !self.secrets.is_supabase_session_expired()? {
            return Ok(stored.access_token);
        }

        self.transition(&CredentialInput::TokenExpired)?;
        let session = self.refresh_with_backoff(&stored.refresh_token).await?;
        let token = session.access_token.clone();
        self.emit(AuthEventKind::TokenRefreshed, Some(session));
        Ok(token)
    }
}
