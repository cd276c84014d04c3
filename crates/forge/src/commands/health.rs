//! Health command - checks whether the backend answers.

use anyhow::Result;
use console::Style;
use serde::Serialize;

use super::Context;

#[derive(Debug, Serialize)]
struct HealthOutput<'a> {
    server_url: &'a str,
    /// Health endpoint answered 200.
    healthy: bool,
    /// Some endpoint answered like a live API.
    reachable: bool,
}

/// Run the health command.
pub async fn run(ctx: &Context) -> Result<()> {
    let client = ctx.client()?;

    let healthy = client.is_api_available().await;
    let reachable = healthy || client.health_check().await;

    if ctx.json_output {
        let output = HealthOutput {
            server_url: &ctx.server_url,
            healthy,
            reachable,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if healthy {
        println!("{} {}", Style::new().green().apply_to("● healthy"), ctx.server_url);
    } else if reachable {
        println!(
            "{} {} (health endpoint not available)",
            Style::new().yellow().apply_to("● reachable"),
            ctx.server_url
        );
    } else {
        println!("{} {}", Style::new().red().apply_to("● unreachable"), ctx.server_url);
    }

    if !reachable {
        anyhow::bail!("API at {} is not reachable", ctx.server_url);
    }
    Ok(())
}
