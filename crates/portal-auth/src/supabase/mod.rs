//! Supabase-backed identity provider and role store.

mod auth;
mod roles;

pub use auth::SupabaseAuthProvider;
pub use roles::{SupabaseRoleStore, USER_ROLES_TABLE};

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Source of a valid access token for authenticated backend calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> AuthResult<String>;
}

/// Length and hash of a response body, for logs that must not carry its content.
pub(crate) fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Project ref from a Supabase URL (`abc123` for `https://abc123.supabase.co`).
///
/// Self-hosted or local URLs use the full host.
pub fn project_ref_from_supabase_url(supabase_url: &str) -> String {
    let host = url::Url::parse(supabase_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    match host {
        Some(host) => match host.strip_suffix(".supabase.co") {
            Some(project) => project.to_string(),
            None => host,
        },
        None => "unknown".to_string(),
    }
}

/// GoTrue operation a failed response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthOp {
    SignIn,
    SignUp,
    Refresh,
    Verify,
    SignOut,
}

/// Error body shapes returned by GoTrue (current and legacy fields).
#[derive(Debug, Default, Deserialize)]
struct GoTrueErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Map a non-success GoTrue response to an [`AuthError`].
pub(crate) fn classify(op: AuthOp, status: StatusCode, body: &str) -> AuthError {
    let parsed: GoTrueErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error_code.or(parsed.error).unwrap_or_default();
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .unwrap_or_else(|| format!("HTTP {} ({})", status, summarize_response_body(body)));

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return AuthError::NetworkError(format!("HTTP {status}: {message}"));
    }

    match code.as_str() {
        "user_already_exists" | "email_exists" => return AuthError::EmailTaken(message),
        "weak_password" => return AuthError::WeakPassword(message),
        _ => {}
    }

    match op {
        AuthOp::SignIn
            if matches!(code.as_str(), "invalid_credentials" | "invalid_grant")
                || status == StatusCode::BAD_REQUEST =>
        {
            AuthError::InvalidCredentials(message)
        }
        AuthOp::Refresh | AuthOp::Verify | AuthOp::SignOut
            if matches!(
                status,
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) =>
        {
            AuthError::Unauthenticated
        }
        _ => AuthError::Unknown(format!("HTTP {status}: {message}")),
    }
}
