//! Role associations: the storage seam and the resolver built on it.

use crate::error::{RoleResolutionError, RoleStoreError};
use crate::Role;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Storage for the one-role-per-identity association.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Role stored for `identity_id`, or `None` if no row exists.
    async fn read(&self, identity_id: &str) -> Result<Option<Role>, RoleStoreError>;

    /// Write `new` if the stored role equals `expected` (`None` means no row).
    ///
    /// Succeeds without writing when `new` is already stored. Fails with
    /// [`RoleStoreError::Conflict`] carrying the stored role otherwise.
    async fn compare_and_set(
        &self,
        identity_id: &str,
        expected: Option<Role>,
        new: Role,
    ) -> Result<(), RoleStoreError>;
}

/// In-process role store for tests and offline runs.
#[derive(Default)]
pub struct MemoryRoleStore {
    roles: Mutex<HashMap<String, Role>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = (S, Role)>,
        S: Into<String>,
    {
        Self {
            roles: Mutex::new(roles.into_iter().map(|(id, r)| (id.into(), r)).collect()),
        }
    }

    /// Number of stored associations.
    pub fn len(&self) -> usize {
        self.roles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.lock().is_empty()
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn read(&self, identity_id: &str) -> Result<Option<Role>, RoleStoreError> {
        Ok(self.roles.lock().get(identity_id).copied())
    }

    async fn compare_and_set(
        &self,
        identity_id: &str,
        expected: Option<Role>,
        new: Role,
    ) -> Result<(), RoleStoreError> {
        let mut roles = self.roles.lock();
        let current = roles.get(identity_id).copied();
        if current == Some(new) {
            return Ok(());
        }
        if current != expected {
            return Err(RoleStoreError::Conflict {
                actual: current.unwrap_or(Role::None),
            });
        }
        roles.insert(identity_id.to_string(), new);
        Ok(())
    }
}

/// Looks up the role for an identity.
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn RoleStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// Role for `identity_id`; [`Role::None`] when none has been assigned.
    pub async fn resolve(&self, identity_id: &str) -> Result<Role, RoleResolutionError> {
        let role = self.store.read(identity_id).await?.unwrap_or(Role::None);
        debug!(user_id = %identity_id, role = %role, "Resolved role");
        Ok(role)
    }
}
