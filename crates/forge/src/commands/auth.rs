//! Login and logout commands.

use std::io::Write;

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;
use serde::Serialize;

use super::{Context, user_error};

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Username (prompted if omitted)
    #[arg(short, long, env = "FORGE_USERNAME")]
    pub username: Option<String>,

    /// Password (prompted without echo if omitted)
    #[arg(long, env = "FORGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginOutput<'a> {
    success: bool,
    message: &'a str,
    username: Option<&'a str>,
}

/// Run the login command.
pub async fn login(args: LoginArgs, ctx: &Context) -> Result<()> {
    let username = match args.username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    if username.is_empty() {
        anyhow::bail!("Username is required");
    }

    let password = match args.password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let session = ctx.session()?;
    let outcome = session
        .login(&username, &password)
        .await
        .map_err(user_error)?;

    if ctx.json_output {
        let output = LoginOutput {
            success: outcome.success,
            message: &outcome.message,
            username: outcome.profile.as_ref().map(|p| p.username.as_str()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if outcome.success {
        println!("{}", Style::new().green().apply_to(&outcome.message));
    } else {
        eprintln!("{}", Style::new().red().apply_to(&outcome.message));
    }

    if !outcome.success {
        anyhow::bail!("Login failed");
    }
    Ok(())
}

/// Run the logout command.
pub async fn logout(ctx: &Context) -> Result<()> {
    let session = ctx.session()?;
    let had_session = session.store().refresh_token()?.is_some();
    session.logout().await.map_err(user_error)?;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "logged_out": true }));
    } else if had_session {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
