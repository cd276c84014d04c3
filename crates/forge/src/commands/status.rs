//! Status command - shows the stored session without touching the network.

use std::path::PathBuf;

use anyhow::Result;
use console::{Style, style};
use forge_session::SessionInfo;
use serde::Serialize;

use super::Context;

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    server_url: &'a str,
    session_file: &'a PathBuf,
    config_files: &'a [PathBuf],
    session: SessionInfo,
}

/// Run the status command.
pub async fn run(ctx: &Context) -> Result<()> {
    let info = ctx.store().session_info()?;

    if ctx.json_output {
        let output = StatusOutput {
            server_url: &ctx.server_url,
            session_file: &ctx.session_file,
            config_files: &ctx.config_sources,
            session: info,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let green = Style::new().green();
    let red = Style::new().red();
    let dim = Style::new().dim();

    println!();
    println!("{}", style("Forge Session").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();

    if info.authenticated {
        println!("  {} {}", dim.apply_to("Status:"), green.apply_to("● logged in"));
    } else if info.has_refresh_token {
        println!(
            "  {} {}",
            dim.apply_to("Status:"),
            style("● refresh pending").yellow()
        );
    } else {
        println!("  {} {}", dim.apply_to("Status:"), red.apply_to("● logged out"));
    }

    if let Some(profile) = &info.profile {
        println!("  {} {}", dim.apply_to("User:"), profile.display_name());
        if !profile.groups.is_empty() {
            println!("  {} {}", dim.apply_to("Groups:"), profile.groups.join(", "));
        }
    }
    if let Some(age) = info.token_age_secs {
        println!("  {} {}", dim.apply_to("Token age:"), format_age(age));
    }
    if let Some(expires) = info.access_expires_at {
        println!("  {} {}", dim.apply_to("Expires:"), expires.to_rfc3339());
    }
    println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);

    if ctx.verbose {
        println!("  {} {}", dim.apply_to("Session:"), ctx.session_file.display());
        for path in &ctx.config_sources {
            println!("  {} {}", dim.apply_to("Config:"), path.display());
        }
    }

    if !info.authenticated && !info.has_refresh_token {
        println!();
        println!("  {}", dim.apply_to("Log in with: forge login"));
    }
    println!();

    Ok(())
}

fn format_age(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}
