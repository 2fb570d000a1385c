//! Build command - Generate the site for the active project.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use codeset_studio::{
    BuildSession, BuildStatus, FailurePolicy, GeminiGateway, Proposal, StudioConfig, WorkspaceView,
};

use super::load_active_project;

#[derive(Args)]
pub struct BuildArgs {
    /// Directory to write the generated files into
    #[arg(short, long, default_value = "codeset-build")]
    out: PathBuf,

    /// Treat a failed generation as an error instead of an empty build
    #[arg(long)]
    strict: bool,
}

pub async fn execute(args: BuildArgs, config: StudioConfig) -> Result<()> {
    let proposal = load_active_project(&config)?;
    let policy = if args.strict {
        FailurePolicy::Strict
    } else {
        config.failure_policy
    };
    let gateway = Arc::new(GeminiGateway::from_config(&config)?);
    let session = BuildSession::new(gateway).with_policy(policy);

    let written = build_into(&session, proposal, &args.out).await?;

    if written == 0 {
        println!("⚠️  Build completed without files. Run `codeset build` again to retry.");
        return Ok(());
    }

    println!("✅ Build complete: {} files", written);
    println!();
    println!("  📁 {}", args.out.display());
    println!("  🌐 {}", args.out.join("index.html").display());
    println!();
    println!("Next steps:");
    println!("  codeset revise \"<instruction>\" --dir {}", args.out.display());

    Ok(())
}

/// Run the build and export it. Returns the number of source files written.
pub async fn build_into(session: &BuildSession, proposal: Proposal, out: &Path) -> Result<usize> {
    let status = session.start(proposal).await?;
    for entry in session.log() {
        println!("{}", entry);
    }

    match status {
        BuildStatus::Failed => {
            let reason = session.last_error().unwrap_or_else(|| "unknown error".to_string());
            anyhow::bail!("Build failed: {}", reason);
        }
        _ if session.files().is_empty() => {
            warn!("Generation produced no files; nothing written");
            return Ok(0);
        }
        _ => {}
    }

    let files = session.files();
    files
        .write_to_dir(out)
        .with_context(|| format!("Failed to write build to {}", out.display()))?;
    WorkspaceView::new(session.clone())
        .deploy(out)
        .context("Failed to write the preview")?;
    info!("Exported {} files to {}", files.len(), out.display());

    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeset_studio::mock::sample_proposal;
    use codeset_studio::MockGateway;

    #[tokio::test]
    async fn test_build_exports_files_and_preview() {
        let temp = tempfile::tempdir().unwrap();
        let session = BuildSession::new(Arc::new(MockGateway::new()));

        let written = build_into(&session, sample_proposal("Torra"), temp.path()).await.unwrap();

        assert_eq!(written, 3);
        assert!(temp.path().join("App.tsx").exists());
        assert!(temp.path().join("index.html").exists());
    }

    #[tokio::test]
    async fn test_lenient_failure_writes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let session = BuildSession::new(Arc::new(MockGateway::new().simulate_failure("503")));

        let written = build_into(&session, sample_proposal("Torra"), temp.path()).await.unwrap();

        assert_eq!(written, 0);
        assert!(!temp.path().join("index.html").exists());
    }

    #[tokio::test]
    async fn test_strict_failure_is_error() {
        let temp = tempfile::tempdir().unwrap();
        let session = BuildSession::new(Arc::new(MockGateway::new().simulate_failure("503")))
            .with_policy(FailurePolicy::Strict);

        let err = build_into(&session, sample_proposal("Torra"), temp.path()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
