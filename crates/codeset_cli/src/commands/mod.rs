//! CLI command definitions.
//!
//! This module defines the command structure for the Code-Set CLI.
//! Each subcommand maps to one step of the studio workflow.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use codeset_studio::{JsonFileStore, KeyValueStore, ProjectStore, Proposal, StudioConfig};

pub mod account;
pub mod asset;
pub mod build;
pub mod narrate;
pub mod plan;
pub mod revise;
pub mod video;

/// Code-Set - autonomous web design studio
#[derive(Parser)]
#[command(name = "codeset")]
#[command(version, about = "Code-Set - autonomous web design studio")]
#[command(long_about = r#"
Code-Set plans a website from a short brief, generates its source files and a
standalone preview, and revises them from natural-language instructions.

WORKFLOW:
  plan      → Plan a website proposal from a brief (saved as the active project)
  build     → Generate source files and preview for the active project
  revise    → Apply an instruction to a build directory
  asset     → Synthesize a brand image
  video     → Render a launch video for the active project
  narrate   → Narrate the strategy summary as audio
  signup    → Create a local account
  login     → Check local account credentials

CONFIGURATION:
  codeset.toml in the working directory (or --config), then the environment:
  GEMINI_API_KEY / API_KEY, CODESET_API_BASE, CODESET_STORE

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Generation service failure
  4 - Malformed response or no asset produced
  5 - Video render failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a codeset.toml configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan a website proposal from a free-text brief
    Plan(plan::PlanArgs),

    /// Generate the site for the active project
    Build(build::BuildArgs),

    /// Revise a build directory from an instruction
    Revise(revise::ReviseArgs),

    /// Synthesize a brand image
    Asset(asset::AssetArgs),

    /// Render the launch video for the active project
    Video(video::VideoArgs),

    /// Narrate the active project's strategy summary
    Narrate(narrate::NarrateArgs),

    /// Create a local account
    Signup(account::AccountArgs),

    /// Log in with a local account
    Login(account::AccountArgs),
}

/// Key-value store configured for this invocation.
pub fn open_store(config: &StudioConfig) -> Arc<dyn KeyValueStore> {
    Arc::new(JsonFileStore::new(config.store_path.clone()))
}

/// The proposal saved by the last `plan`.
pub fn load_active_project(config: &StudioConfig) -> Result<Proposal> {
    ProjectStore::new(open_store(config))
        .load()
        .context("Failed to read the active project")?
        .context("No active project. Run `codeset plan <brief>` first.")
}
