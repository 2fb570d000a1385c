//! Plan command - Turn a brief into a website proposal.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use codeset_studio::{GeminiGateway, GenerationGateway, ProjectStore, Proposal, StudioConfig};

use super::open_store;

#[derive(Args)]
pub struct PlanArgs {
    /// Free-text description of the business
    brief: String,

    /// Print the proposal as JSON
    #[arg(long)]
    json: bool,

    /// Do not save the proposal as the active project
    #[arg(long)]
    no_save: bool,
}

pub async fn execute(args: PlanArgs, config: StudioConfig) -> Result<()> {
    let gateway = GeminiGateway::from_config(&config)?;
    let proposal = plan(&gateway, &args.brief).await?;

    if !args.no_save {
        ProjectStore::new(open_store(&config))
            .save(&proposal)
            .context("Failed to save the active project")?;
        info!("Saved active project to {}", config.store_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&proposal)?);
        return Ok(());
    }

    println!("✅ Proposal ready: {}", proposal.business_name);
    println!();
    println!("{}", proposal.outline());
    if !proposal.color_palette.is_empty() {
        println!();
        println!("Palette: {}", proposal.color_palette.join(", "));
    }
    if !proposal.market_insights.is_empty() {
        println!();
        println!("Market insights:");
        println!("  {}", proposal.market_insights);
    }
    println!();
    println!("Next steps:");
    println!("  codeset build --out site");

    Ok(())
}

async fn plan(gateway: &dyn GenerationGateway, brief: &str) -> Result<Proposal> {
    let brief = brief.trim();
    if brief.is_empty() {
        anyhow::bail!("Invalid argument: the brief must not be empty");
    }
    info!("Planning website for brief: {}", brief);
    gateway
        .propose_website(brief)
        .await
        .context("Failed to plan the website")
}
