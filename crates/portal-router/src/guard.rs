//! Route guard decision.

use portal_auth::{Role, Session};
use serde::Serialize;

pub const SIGN_IN_PATH: &str = "/";
pub const ROLE_SELECT_PATH: &str = "/role-select";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    SignIn,
    RoleSelect,
}

impl Redirect {
    pub fn path(&self) -> &'static str {
        match self {
            Redirect::SignIn => SIGN_IN_PATH,
            Redirect::RoleSelect => ROLE_SELECT_PATH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "to")]
pub enum GuardDecision {
    /// Session still loading; show the "checking session" state.
    Checking,
    Render,
    Redirect(Redirect),
}

/// Decide what a protected route shows for `session`.
///
/// `required_role` of `None` admits any signed-in user.
pub fn evaluate(session: &Session, required_role: Option<Role>) -> GuardDecision {
    if !session.is_resolved() {
        return GuardDecision::Checking;
    }
    if !session.is_authenticated() {
        return GuardDecision::Redirect(Redirect::SignIn);
    }
    match required_role {
        None => GuardDecision::Render,
        Some(required) if session.role == Some(required) => GuardDecision::Render,
        Some(_) => GuardDecision::Redirect(Redirect::RoleSelect),
    }
}
