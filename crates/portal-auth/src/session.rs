//! Session projection published to the rest of the portal.

use crate::Role;
use serde::{Deserialize, Serialize};

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// An identity-provider event is being processed
    Loading,
    /// Identity and role reflect the latest event
    Resolved,
}

/// `{identity, role, status}` as seen by route guards.
///
/// While loading, `role` is `None`. Once resolved with an identity, `role`
/// is always `Some`, using [`Role::None`] when the user has not picked one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Option<Identity>,
    pub role: Option<Role>,
    pub status: SessionStatus,
}

impl Session {
    /// Initial state at process start.
    pub fn loading() -> Self {
        Self {
            identity: None,
            role: None,
            status: SessionStatus::Loading,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            identity: None,
            role: None,
            status: SessionStatus::Resolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == SessionStatus::Resolved
    }

    pub fn identity_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.id.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::loading()
    }
}
