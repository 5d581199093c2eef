//! Authentication and role resolution for the HealthSwift partner portal.
//!
//! This crate provides:
//! - [`SessionStore`]: the published `{identity, role, status}` session
//! - [`RoleResolver`] over a pluggable [`RoleStore`]
//! - [`AuthSessionManager`]: sign-in, sign-up, sign-out and role assignment,
//!   driven by an [`IdentityProvider`] event stream
//! - Supabase implementations of the provider and the role store, with an
//!   explicit credential FSM and persisted sessions

mod auth_fsm;
mod credentials;
mod error;
mod manager;
mod provider;
mod resolver;
mod role;
mod session;
mod store;
pub mod supabase;

pub use auth_fsm::credential_machine;
pub use auth_fsm::{
    CredentialInput, CredentialMachine, CredentialMachineState, CredentialState, RefreshConfig,
};
pub use credentials::{validate_sign_in, validate_sign_up, MIN_PASSWORD_LEN};
pub use error::{AuthError, AuthResult, ErrorPresentation, RoleResolutionError, RoleStoreError};
pub use manager::AuthSessionManager;
pub use provider::{AuthEvent, AuthEventKind, IdentityProvider, ProviderSession};
pub use resolver::{MemoryRoleStore, RoleResolver, RoleStore};
pub use role::{ParseRoleError, Role};
pub use session::{Identity, Session, SessionStatus};
pub use store::{ResolutionTag, SessionStore};
pub use supabase::{AccessTokenSource, SupabaseAuthProvider, SupabaseRoleStore};
