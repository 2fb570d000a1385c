//! Code-Set CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Generation service failure
//! - 4: Malformed response or no asset produced
//! - 5: Video render failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use codeset_studio::{ErrorKind, StudioConfig, StudioError};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const UPSTREAM_FAILURE: u8 = 3;
    pub const MALFORMED_RESPONSE: u8 = 4;
    pub const RENDER_FAILURE: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "codeset=debug,info"
    } else if cli.quiet {
        "warn"
    } else {
        "codeset=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match StudioConfig::load(cli.config.as_deref()) {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(anyhow::Error::new(e).context("Failed to load configuration")),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

async fn run(command: Commands, config: StudioConfig) -> anyhow::Result<()> {
    match command {
        Commands::Plan(args) => commands::plan::execute(args, config).await,
        Commands::Build(args) => commands::build::execute(args, config).await,
        Commands::Revise(args) => commands::revise::execute(args, config).await,
        Commands::Asset(args) => commands::asset::execute(args, config).await,
        Commands::Video(args) => commands::video::execute(args, config).await,
        Commands::Narrate(args) => commands::narrate::execute(args, config).await,
        Commands::Signup(args) => commands::account::signup(args, config).await,
        Commands::Login(args) => commands::account::login(args, config).await,
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let studio_error = e.chain().find_map(|c| c.downcast_ref::<StudioError>());

    match studio_error {
        Some(StudioError::NotConfigured) | Some(StudioError::Config(_)) => ExitCodes::INVALID_ARGS,
        Some(err) => match err.kind() {
            ErrorKind::Upstream => ExitCodes::UPSTREAM_FAILURE,
            ErrorKind::MalformedResponse | ErrorKind::NoAssetProduced => ExitCodes::MALFORMED_RESPONSE,
            ErrorKind::RenderFailed => ExitCodes::RENDER_FAILURE,
            ErrorKind::Session | ErrorKind::Account | ErrorKind::Local => ExitCodes::GENERAL_ERROR,
        },
        None => ExitCodes::GENERAL_ERROR,
    }
}
