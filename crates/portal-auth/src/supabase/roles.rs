//! PostgREST-backed role store on the `user_roles` table.

use super::{summarize_response_body, AccessTokenSource};
use crate::error::RoleStoreError;
use crate::resolver::RoleStore;
use crate::{AuthError, Role};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// `user_roles(user_id primary key, role)`.
pub const USER_ROLES_TABLE: &str = "user_roles";

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

#[derive(Serialize)]
struct InsertRoleRequest<'a> {
    user_id: &'a str,
    role: Role,
}

#[derive(Serialize)]
struct UpdateRoleRequest {
    role: Role,
}

/// Role store calling the Supabase REST API as the signed-in user.
pub struct SupabaseRoleStore {
    http_client: Client,
    supabase_url: String,
    publishable_key: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl SupabaseRoleStore {
    pub fn new(
        supabase_url: &str,
        publishable_key: &str,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            http_client: Client::new(),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            publishable_key: publishable_key.to_string(),
            tokens,
        }
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.supabase_url, USER_ROLES_TABLE)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, RoleStoreError> {
        let token = self.tokens.access_token().await.map_err(|e| match e {
            AuthError::Unauthenticated => RoleStoreError::Unauthenticated,
            e if e.is_transient() => RoleStoreError::Unavailable(e.to_string()),
            e => RoleStoreError::Rejected(e.to_string()),
        })?;
        Ok(request
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RoleStoreError> {
        let response = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| RoleStoreError::Unavailable(e.to_string()))?;
        Ok(response)
    }

    async fn rows(response: Response) -> Result<Vec<RoleRow>, RoleStoreError> {
        response
            .json()
            .await
            .map_err(|e| RoleStoreError::Rejected(format!("unexpected response: {e}")))
    }

    async fn patch_role(
        &self,
        identity_id: &str,
        expected: Role,
        new: Role,
    ) -> Result<bool, RoleStoreError> {
        let request = self
            .http_client
            .patch(self.rest_url())
            .query(&[
                ("user_id", format!("eq.{identity_id}")),
                ("role", format!("eq.{}", expected.as_str())),
            ])
            .header("Prefer", "return=representation")
            .json(&UpdateRoleRequest { role: new });
        let response = check(self.send(request).await?, "update role").await?;
        Ok(!Self::rows(response).await?.is_empty())
    }

    async fn insert_role(&self, identity_id: &str, role: Role) -> Result<bool, RoleStoreError> {
        let request = self
            .http_client
            .post(self.rest_url())
            .header("Prefer", "return=minimal")
            .json(&InsertRoleRequest {
                user_id: identity_id,
                role,
            });
        let response = self.send(request).await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        check(response, "insert role").await?;
        Ok(true)
    }

    /// After a lost write: succeed if `new` is stored, else report the winner.
    async fn settle(&self, identity_id: &str, new: Role) -> Result<(), RoleStoreError> {
        let actual = self.read(identity_id).await?;
        if actual == Some(new) {
            return Ok(());
        }
        let actual = actual.unwrap_or(Role::None);
        info!(user_id = %identity_id, actual = %actual, attempted = %new, "Role write lost to concurrent writer");
        Err(RoleStoreError::Conflict { actual })
    }
}

/// Map a PostgREST failure status to a [`RoleStoreError`].
async fn check(response: Response, action: &str) -> Result<Response, RoleStoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body_summary = summarize_response_body(&body);
    error!(status = %status, body_summary = %body_summary, action, "Role store request failed");

    let message = format!("{action}: {status} ({body_summary})");
    Err(match status {
        StatusCode::UNAUTHORIZED => RoleStoreError::Unauthenticated,
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            RoleStoreError::Unavailable(message)
        }
        _ => RoleStoreError::Rejected(message),
    })
}

#[async_trait]
impl RoleStore for SupabaseRoleStore {
    async fn read(&self, identity_id: &str) -> Result<Option<Role>, RoleStoreError> {
        let request = self.http_client.get(self.rest_url()).query(&[
            ("select", "role".to_string()),
            ("user_id", format!("eq.{identity_id}")),
            ("limit", "1".to_string()),
        ]);
        let response = check(self.send(request).await?, "read role").await?;
        let row = Self::rows(response).await?.into_iter().next();

        match row {
            None => Ok(None),
            Some(row) => {
                let role: Role = row
                    .role
                    .parse()
                    .map_err(|e: crate::ParseRoleError| RoleStoreError::Rejected(e.to_string()))?;
                debug!(user_id = %identity_id, role = %role, "Fetched role row");
                Ok(role.is_assigned().then_some(role))
            }
        }
    }

    async fn compare_and_set(
        &self,
        identity_id: &str,
        expected: Option<Role>,
        new: Role,
    ) -> Result<(), RoleStoreError> {
        let written = match expected {
            None => self.insert_role(identity_id, new).await?,
            Some(expected) => self.patch_role(identity_id, expected, new).await?,
        };
        if written {
            debug!(user_id = %identity_id, role = %new, "Role row written");
            return Ok(());
        }
        self.settle(identity_id, new).await
    }
}
