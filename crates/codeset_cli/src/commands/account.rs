//! Account commands - Local sign-up and log-in.

use anyhow::Result;
use clap::Args;
use tracing::info;

use codeset_studio::{AccountRegistry, StudioConfig};

use super::open_store;

#[derive(Args)]
pub struct AccountArgs {
    /// Account email
    #[arg(long)]
    email: String,

    /// Account password
    #[arg(long, env = "CODESET_PASSWORD", hide_env_values = true)]
    password: String,
}

pub async fn signup(args: AccountArgs, config: StudioConfig) -> Result<()> {
    let registry = AccountRegistry::new(open_store(&config));
    registry.sign_up(args.email.trim(), &args.password)?;
    info!("Registered {} in {}", args.email.trim(), config.store_path.display());

    println!("✅ Account created: {}", args.email.trim());
    println!();
    println!("Next steps:");
    println!("  codeset plan \"<describe your business>\"");
    Ok(())
}

pub async fn login(args: AccountArgs, config: StudioConfig) -> Result<()> {
    let registry = AccountRegistry::new(open_store(&config));
    registry.log_in(args.email.trim(), &args.password)?;

    println!("✅ Logged in as {}", args.email.trim());
    Ok(())
}
