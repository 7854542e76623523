//! Authentication commands for the catalog CLI
//!
//! Login is a static credential comparison against the configured account;
//! the resulting session flag is persisted by the core session store and
//! gates every catalog command.

use anyhow::{Context, Result, bail};
use catalog_client_core::{Credentials, SessionStore};
use dialoguer::{Input, Password};

/// Prompt for credentials and persist the session flag on success
pub fn login(session: &SessionStore, expected: &Credentials) -> Result<()> {
    println!("Catalog Login");
    println!("=============");

    let username: String = Input::new()
        .with_prompt("Username")
        .interact_text()
        .context("Failed to read username")?;

    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")?;

    if !session
        .login(expected, &username, &password)
        .context("Failed to persist session")?
    {
        bail!("Invalid username or password");
    }

    println!("\n✓ Logged in as {username}");
    Ok(())
}

/// Clear the persisted session flag
pub fn logout(session: &SessionStore) -> Result<()> {
    if session.current_user().is_none() {
        println!("No active session.");
        return Ok(());
    }
    session.logout().context("Failed to clear session")?;
    println!("✓ Logged out");
    Ok(())
}

/// Show the current session state
pub fn status(session: &SessionStore) -> Result<()> {
    match session.current_user() {
        Some(username) => println!("Logged in as {username}"),
        None => {
            println!("Not logged in.");
            println!("Use 'catalog login' to authenticate.");
        }
    }
    Ok(())
}

/// Bail out unless a session is active
pub fn require_session(session: &SessionStore) -> Result<()> {
    if !session.is_authenticated() {
        bail!("This command requires login. Run 'catalog login' first.");
    }
    Ok(())
}
