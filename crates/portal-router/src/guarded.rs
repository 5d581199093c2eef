//! A guard that re-evaluates as the session changes.

use crate::guard::{evaluate, GuardDecision};
use portal_auth::{Role, Session};
use tokio::sync::watch;
use tracing::debug;

/// Route guard bound to a session stream.
pub struct GuardedRoute {
    sessions: watch::Receiver<Session>,
    required_role: Option<Role>,
}

impl GuardedRoute {
    pub fn new(sessions: watch::Receiver<Session>, required_role: Option<Role>) -> Self {
        Self {
            sessions,
            required_role,
        }
    }

    pub fn required_role(&self) -> Option<Role> {
        self.required_role
    }

    /// Change the route's requirement; takes effect on the next decision.
    pub fn set_required_role(&mut self, required_role: Option<Role>) {
        self.required_role = required_role;
    }

    /// Decision for the current session.
    pub fn decision(&self) -> GuardDecision {
        evaluate(&self.sessions.borrow(), self.required_role)
    }

    /// Wait for the next session update and decide again.
    ///
    /// Returns `None` once the session source is gone.
    pub async fn changed(&mut self) -> Option<GuardDecision> {
        self.sessions.changed().await.ok()?;
        let decision = self.decision();
        debug!(?decision, required_role = ?self.required_role, "Guard re-evaluated");
        Some(decision)
    }

    /// First decision that is not [`GuardDecision::Checking`].
    pub async fn settled(&mut self) -> GuardDecision {
        let required_role = self.required_role;
        let settled = self
            .sessions
            .wait_for(|session| evaluate(session, required_role) != GuardDecision::Checking)
            .await
            .map(|session| evaluate(&session, required_role));
        settled.unwrap_or_else(|_| self.decision())
    }
}
