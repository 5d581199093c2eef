//! Portal route table and navigation.

use crate::guard::{evaluate, GuardDecision, ROLE_SELECT_PATH, SIGN_IN_PATH};
use portal_auth::{Role, Session};
use serde::Serialize;

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "role")]
pub enum RouteAccess {
    Public,
    /// Any signed-in user, with or without a role.
    Authenticated,
    Role(Role),
}

impl RouteAccess {
    /// Role handed to the guard, if any.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            RouteAccess::Role(role) => Some(*role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    pub path: &'static str,
    pub access: RouteAccess,
}

const fn route(path: &'static str, access: RouteAccess) -> Route {
    Route { path, access }
}

const PORTAL_ROUTES: &[Route] = &[
    route(SIGN_IN_PATH, RouteAccess::Public),
    route(ROLE_SELECT_PATH, RouteAccess::Authenticated),
    route("/doctor", RouteAccess::Role(Role::Doctor)),
    route("/doctor/slots", RouteAccess::Role(Role::Doctor)),
    route("/doctor/appointments", RouteAccess::Role(Role::Doctor)),
    route("/doctor/profile", RouteAccess::Role(Role::Doctor)),
    route("/lab", RouteAccess::Role(Role::DiagnosticCenter)),
    route("/lab/reports", RouteAccess::Role(Role::DiagnosticCenter)),
    route("/lab/upload", RouteAccess::Role(Role::DiagnosticCenter)),
    route("/lab/tests", RouteAccess::Role(Role::DiagnosticCenter)),
    route("/lab/bookings", RouteAccess::Role(Role::DiagnosticCenter)),
    route("/lab/profile", RouteAccess::Role(Role::DiagnosticCenter)),
    route("/physio", RouteAccess::Role(Role::Physiotherapist)),
    route("/physio/profile", RouteAccess::Role(Role::Physiotherapist)),
    route("/ecg", RouteAccess::Role(Role::EcgLab)),
    route("/ecg/profile", RouteAccess::Role(Role::EcgLab)),
];

/// Ordered list of routes; lookups take the first match.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Routes of the partner portal.
    pub fn portal() -> Self {
        Self::new(PORTAL_ROUTES.to_vec())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route whose path equals `path`, ignoring a trailing slash.
    pub fn lookup(&self, path: &str) -> Option<&Route> {
        let path = normalize(path);
        self.routes.iter().find(|r| r.path == path)
    }

    /// Resolve `path` for `session`.
    pub fn navigate(&self, path: &str, session: &Session) -> Navigation {
        let Some(route) = self.lookup(path) else {
            return Navigation::NotFound;
        };
        if route.access == RouteAccess::Public {
            return Navigation::Render { path: route.path };
        }
        match evaluate(session, route.access.required_role()) {
            GuardDecision::Checking => Navigation::Checking,
            GuardDecision::Render => Navigation::Render { path: route.path },
            GuardDecision::Redirect(redirect) => Navigation::Redirect { to: redirect.path() },
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::portal()
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim();
    match trimmed.trim_end_matches('/') {
        "" => SIGN_IN_PATH,
        p => p,
    }
}

/// Outcome of opening a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Navigation {
    Render { path: &'static str },
    Checking,
    Redirect { to: &'static str },
    NotFound,
}

/// Landing page for a role after sign-in.
pub fn home_path_for(role: Role) -> &'static str {
    match role {
        Role::Doctor => "/doctor",
        Role::DiagnosticCenter => "/lab",
        Role::Physiotherapist => "/physio",
        Role::EcgLab => "/ecg",
        Role::None => ROLE_SELECT_PATH,
    }
}

/// Where the sign-in page sends a session that is already signed in.
///
/// `None` while loading or signed out: the sign-in page stays put.
pub fn login_redirect(session: &Session) -> Option<&'static str> {
    if !session.is_resolved() || !session.is_authenticated() {
        return None;
    }
    Some(home_path_for(session.role.unwrap_or(Role::None)))
}
