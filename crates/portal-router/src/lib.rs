//! Route protection for the partner portal.
//!
//! [`evaluate`] is the pure guard policy. [`RouteTable`] maps portal paths to
//! their access rules and resolves navigation, and [`GuardedRoute`] keeps a
//! decision current as the session store publishes updates. Performing the
//! redirect is left to the caller.

mod guard;
mod guarded;
mod routes;

pub use guard::{evaluate, GuardDecision, Redirect, ROLE_SELECT_PATH, SIGN_IN_PATH};
pub use guarded::GuardedRoute;
pub use routes::{home_path_for, login_redirect, Navigation, Route, RouteAccess, RouteTable};
