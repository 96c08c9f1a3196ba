//! CLI command implementations

pub mod auth;
pub mod config;
pub mod post;
pub mod profile;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use dialoguer::Password;
use tracing::debug;

use adopta_core::AdoptaContext;

/// Get the adopta directory from environment or default
pub fn get_app_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ADOPTA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".adopta"))
        .ok_or_else(|| anyhow!("Could not find home directory; set ADOPTA_DIR"))
}

/// Open the context and wait until the provider has reported once, so the
/// snapshot reflects the provider rather than only the cache
pub async fn get_context() -> Result<AdoptaContext> {
    let app_dir = get_app_dir()?;
    debug!(dir = %app_dir.display(), "Opening app directory");
    let context = AdoptaContext::open(&app_dir)
        .await
        .context("Failed to initialize adopta context")?;

    context
        .notifications_handled()
        .wait_for(|handled| *handled >= 1)
        .await
        .context("Session listener stopped before reporting")?;
    Ok(context)
}

/// Use the given password or prompt for one without echo
pub fn password_or_prompt(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    let prompt = Password::new().with_prompt("Password");
    let password = if confirm {
        prompt
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?
    } else {
        prompt.interact()?
    };
    Ok(password)
}
