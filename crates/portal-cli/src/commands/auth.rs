//! Authentication and role commands.

use super::{auth_failure, Portal, SessionReport};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use portal_auth::{AuthError, Role};
use std::io::{self, Write};
use std::time::Duration;
use tracing::info;

/// How long sign-up waits for a session before assuming email confirmation.
const SIGN_UP_SESSION_WAIT: Duration = Duration::from_secs(3);

/// Credentials from flags or interactive prompts.
fn read_credentials(email: Option<String>) -> Result<(String, String)> {
    let email = match email {
        Some(email) => email,
        None => {
            print!("Email: ");
            io::stdout().flush()?;
            let mut email = String::new();
            io::stdin().read_line(&mut email)?;
            email.trim().to_string()
        }
    };
    let password = rpassword::prompt_password("Password: ")?;
    Ok((email, password))
}

/// Sign in with email and password.
pub async fn login(portal: &Portal, email: Option<String>, format: &OutputFormat) -> Result<()> {
    let current = portal.resolved().await?;
    if let Some(identity) = &current.identity {
        let who = identity.email.as_deref().unwrap_or(&identity.id);
        output::print_success(&format!("Already signed in as {}", who), format);
        return Ok(());
    }

    let (email, password) = read_credentials(email)?;
    portal
        .manager
        .sign_in(&email, &password)
        .await
        .map_err(auth_failure)?;

    let session = portal.signed_in().await?;
    info!(user_id = ?session.identity_id(), "Signed in from CLI");
    output::print(&SessionReport::from(&session), format);
    Ok(())
}

/// Register a new account.
pub async fn signup(portal: &Portal, email: Option<String>, format: &OutputFormat) -> Result<()> {
    portal.resolved().await?;

    let (email, password) = read_credentials(email)?;
    portal
        .manager
        .sign_up(&email, &password)
        .await
        .map_err(auth_failure)?;

    let store = portal.manager.store();
    let signed_in = tokio::time::timeout(
        SIGN_UP_SESSION_WAIT,
        store.wait_until(|s| s.is_resolved() && s.is_authenticated()),
    )
    .await;

    match signed_in {
        Ok(session) => output::print(&SessionReport::from(&session), format),
        Err(_) => output::print_success(
            &format!("Account created. Confirm the link sent to {} and then log in", email),
            format,
        ),
    }
    Ok(())
}

/// Sign out and forget stored credentials.
pub async fn logout(portal: &Portal, format: &OutputFormat) -> Result<()> {
    let session = portal.resolved().await?;

    // Always clears stored credentials, including ones that failed to restore.
    let result = portal.manager.sign_out().await;
    if !session.is_authenticated() {
        output::print_success("Not signed in", format);
        return Ok(());
    }
    if let Err(err) = result {
        output::print_error(
            &format!("Signed out locally, but the server did not confirm: {}", err),
            format,
        );
        return Ok(());
    }
    output::print_success("Signed out", format);
    Ok(())
}

/// Show the current session.
pub async fn status(portal: &Portal, format: &OutputFormat) -> Result<()> {
    let session = portal.resolved().await?;
    output::print(&SessionReport::from(&session), format);
    Ok(())
}

/// Pick the partner role for the signed-in account.
pub async fn set_role(portal: &Portal, role: Role, format: &OutputFormat) -> Result<()> {
    let session = portal.resolved().await?;
    if !session.is_authenticated() {
        return Err(auth_failure(AuthError::Unauthenticated));
    }

    match portal.manager.set_role(role).await {
        Ok(()) => {}
        Err(AuthError::Conflict { actual }) => {
            portal.manager.refresh_role().await.map_err(auth_failure)?;
            bail!(
                "This account is already registered as {}",
                actual.display_name()
            );
        }
        Err(err) => return Err(auth_failure(err)),
    }

    output::print(&SessionReport::from(&portal.manager.session()), format);
    Ok(())
}
