//! Credential lifecycle state machine for the Supabase provider.
//!
//! ```text
//!                 ┌──────────────┐
//!      ┌─────────►│  SignedOut   │◄──────────────────────────────┐
//!      │          └──────┬───────┘                               │
//!      │   SignInAttempt │ SignUpAttempt │ RestoreAttempt        │
//!      │                 ▼               ▼                       │
//!      │   SigningIn  SigningUp      Restoring ──NoSession───────┤
//!      │       │          │              │ TokenNotExpired       │
//!      │       │          │              ▼                       │
//!      │       │          │      VerifyingWithServer ─Rejected───┤
//!      │       │          │              │ Verified/Unreachable  │
//!      │       ▼          ▼              ▼                       │
//!      │    ┌──────────────────────────────┐  TokenExpired  ┌────┴──────┐
//!      │    │           SignedIn           │───────────────►│ Refreshing│
//!      │    └──────────────┬───────────────┘◄───────────────└───────────┘
//!      │                   │ SignOutRequested  RefreshSuccess
//!      │                   ▼
//!      └─SignOutComplete─ SigningOut
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub credential_machine(SignedOut)

    SignedOut => {
        RestoreAttempt => Restoring,
        SignInAttempt => SigningIn,
        SignUpAttempt => SigningUp,
        // Credentials left on disk by an earlier run
        TokenExpired => Refreshing,
        SignOutRequested => SigningOut
    },
    Restoring => {
        TokenNotExpired => VerifyingWithServer,
        SessionExpired => Refreshing,
        NoSession => SignedOut
    },
    VerifyingWithServer => {
        ServerVerified => SignedIn,
        // Server unreachable: keep the stored session
        ServerUnreachable => SignedIn,
        ServerRejected => SignedOut
    },
    SigningIn => {
        SignInSuccess => SignedIn,
        SignInFailed => SignedOut
    },
    SigningUp => {
        SignUpWithSession => SignedIn,
        SignUpPendingConfirmation => SignedOut,
        SignUpFailed => SignedOut
    },
    SignedIn => {
        TokenExpired => Refreshing,
        RestoreAttempt => Restoring,
        SignInAttempt => SigningIn,
        SignUpAttempt => SigningUp,
        SignOutRequested => SigningOut
    },
    Refreshing => {
        RefreshSuccess => SignedIn,
        RefreshRetry => Refreshing,
        RefreshFailed => SignedOut
    },
    SigningOut => {
        SignOutComplete => SignedOut
    }
}

pub use credential_machine::Input as CredentialInput;
pub use credential_machine::State as CredentialMachineState;
pub use credential_machine::StateMachine as CredentialMachine;

/// Serializable view of the machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    SignedOut,
    Restoring,
    VerifyingWithServer,
    SigningIn,
    SigningUp,
    SignedIn,
    Refreshing,
    SigningOut,
}

impl CredentialState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CredentialState::SignedIn)
    }

    /// True while a provider request is in flight.
    pub fn is_transient(&self) -> bool {
        !matches!(self, CredentialState::SignedOut | CredentialState::SignedIn)
    }
}

impl From<&CredentialMachineState> for CredentialState {
    fn from(state: &CredentialMachineState) -> Self {
        match state {
            CredentialMachineState::SignedOut => CredentialState::SignedOut,
            CredentialMachineState::Restoring => CredentialState::Restoring,
            CredentialMachineState::VerifyingWithServer => CredentialState::VerifyingWithServer,
            CredentialMachineState::SigningIn => CredentialState::SigningIn,
            CredentialMachineState::SigningUp => CredentialState::SigningUp,
            CredentialMachineState::SignedIn => CredentialState::SignedIn,
            CredentialMachineState::Refreshing => CredentialState::Refreshing,
            CredentialMachineState::SigningOut => CredentialState::SigningOut,
        }
    }
}

/// Retry policy for token refresh.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Maximum number of attempts.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RefreshConfig {
    /// Delay before retrying after attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay_ms = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}
