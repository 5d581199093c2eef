//! Portal navigation commands.

use super::Portal;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use portal_auth::Session;
use portal_router::{Navigation, Route, RouteAccess, RouteTable};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Redirects are never chained deeper than this.
const MAX_REDIRECTS: usize = 3;

/// Every hop taken while opening a path.
#[derive(Debug, Serialize)]
pub struct NavigationTrace {
    pub requested: String,
    pub hops: Vec<Navigation>,
}

impl NavigationTrace {
    /// Path that ends up rendered, if any.
    pub fn rendered(&self) -> Option<&'static str> {
        match self.hops.last() {
            Some(Navigation::Render { path }) => Some(*path),
            _ => None,
        }
    }
}

impl fmt::Display for NavigationTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.requested)?;
        for hop in &self.hops {
            match hop {
                Navigation::Redirect { to } => write!(f, " -> {}", to)?,
                Navigation::Render { path } => write!(f, "\nRendering {}", path)?,
                Navigation::Checking => write!(f, "\nChecking session...")?,
                Navigation::NotFound => write!(f, "\nNo such page")?,
            }
        }
        Ok(())
    }
}

/// Navigate to `path`, following redirects.
pub fn follow(routes: &RouteTable, path: &str, session: &Session) -> NavigationTrace {
    let mut hops = Vec::new();
    let mut next = routes.navigate(path, session);
    loop {
        hops.push(next);
        match next {
            Navigation::Redirect { to } if hops.len() <= MAX_REDIRECTS => {
                debug!(from = %path, to, "Following redirect");
                next = routes.navigate(to, session);
            }
            _ => break,
        }
    }
    NavigationTrace {
        requested: path.to_string(),
        hops,
    }
}

/// Open a portal page as the current session.
pub async fn open(portal: &Portal, path: &str, format: &OutputFormat) -> Result<()> {
    let session = portal.resolved().await?;
    let trace = follow(&portal.routes, path, &session);
    debug!(requested = %path, rendered = ?trace.rendered(), "Opened page");
    output::print(&trace, format);
    if matches!(trace.hops.last(), Some(Navigation::NotFound)) {
        bail!("No page at {}", path);
    }
    Ok(())
}

/// Routes annotated with who may open them.
#[derive(Debug, Serialize)]
pub struct RouteListing {
    pub routes: Vec<Route>,
}

impl fmt::Display for RouteListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .routes
            .iter()
            .map(|route| {
                let access = match route.access {
                    RouteAccess::Public => "public".to_string(),
                    RouteAccess::Authenticated => "signed in".to_string(),
                    RouteAccess::Role(role) => role.display_name().to_string(),
                };
                output::row(route.path, &access)
            })
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// List the portal's routes.
pub fn routes(table: &RouteTable, format: &OutputFormat) {
    let listing = RouteListing {
        routes: table.routes().to_vec(),
    };
    output::print(&listing, format);
}
