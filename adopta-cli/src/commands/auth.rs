//! Account commands - signup, login, logout, whoami

use anyhow::Result;
use colored::Colorize;

use adopta_core::User;

use super::{get_context, password_or_prompt};
use crate::output;

pub async fn signup(
    email: String,
    name: Option<String>,
    phone: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = password_or_prompt(password, !json)?;
    let mut data = User::new(email).with_password(password);
    data.name = name;
    data.phone = phone;

    let mut ctx = get_context().await?;
    let result = ctx.sign_up(data).await;
    ctx.shutdown().await;

    output::report(json, result, |user| {
        output::success(&format!("Welcome, {}!", user.name.as_deref().unwrap_or(&user.email)));
        println!("{}", output::user_table(user));
    })
}

pub async fn login(email: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = password_or_prompt(password, false)?;

    let mut ctx = get_context().await?;
    let result = ctx.login(email, &password).await;
    ctx.shutdown().await;

    output::report(json, result, |user| {
        output::success(&format!("Signed in as {}", user.email));
    })
}

pub async fn logout(json: bool) -> Result<()> {
    let mut ctx = get_context().await?;
    let was_signed = ctx.snapshot().signed;
    let result = ctx.sign_out().await;
    ctx.shutdown().await;

    output::report(json, result, |_| {
        if was_signed {
            output::success("Signed out");
        } else {
            output::info("No active session");
        }
    })
}

pub async fn whoami(json: bool) -> Result<()> {
    let mut ctx = get_context().await?;
    let snapshot = ctx.snapshot();
    ctx.shutdown().await;

    output::report(json, Ok(snapshot), |snapshot| match &snapshot.user {
        Some(user) => {
            println!("{}", "Signed in".bold());
            println!("{}", output::user_table(user));
        }
        None => output::warning("Not signed in. Run 'adopta login <email>' or 'adopta signup <email>'."),
    })
}
