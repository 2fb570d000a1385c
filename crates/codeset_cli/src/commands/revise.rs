//! Revise command - Apply an instruction to a build directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use codeset_studio::workspace::DEPLOY_FILE_NAME;
use codeset_studio::{
    BuildSession, FileSet, GeminiGateway, GeneratedSite, GenerationGateway, Proposal, StudioConfig,
    WorkspaceView,
};

use super::load_active_project;

#[derive(Args)]
pub struct ReviseArgs {
    /// What to change, in plain language
    pub instruction: String,

    /// Build directory produced by `codeset build`
    #[arg(short, long)]
    pub dir: PathBuf,
}

pub async fn execute(args: ReviseArgs, config: StudioConfig) -> Result<()> {
    let proposal = load_active_project(&config)?;
    let gateway = Arc::new(GeminiGateway::from_config(&config)?);

    let count = revise_dir(gateway, proposal, &args.dir, &args.instruction).await?;

    println!("✅ Revision applied: {} files in {}", count, args.dir.display());
    Ok(())
}

/// Load `dir`, revise it and write the replacement back. Returns the new file count.
pub async fn revise_dir(
    gateway: Arc<dyn GenerationGateway>,
    proposal: Proposal,
    dir: &Path,
    instruction: &str,
) -> Result<usize> {
    if !dir.is_dir() {
        anyhow::bail!("Build directory not found: {}", dir.display());
    }
    let mut files = FileSet::read_from_dir(dir)
        .with_context(|| format!("Failed to read build from {}", dir.display()))?;
    let preview = files
        .take(DEPLOY_FILE_NAME)
        .map(|f| f.content)
        .unwrap_or_default();
    let previous: Vec<String> = files.names().into_iter().map(String::from).collect();
    info!("Revising {} files from {}", previous.len(), dir.display());

    let session = BuildSession::resume(
        gateway,
        proposal,
        GeneratedSite {
            source_files: files,
            preview_document: preview,
        },
    );
    let result = session.request_revision(instruction).await;
    for entry in session.log() {
        println!("{}", entry);
    }
    result.context("Revision failed")?;

    // Dropped files are removed only once the whole revision is on disk.
    let revised = session.files();
    revised
        .write_to_dir(dir)
        .with_context(|| format!("Failed to write revision to {}", dir.display()))?;
    if !session.preview_document().is_empty() {
        WorkspaceView::new(session.clone()).deploy(dir)?;
    }
    for name in previous.iter().filter(|n| revised.by_name(n).is_none()) {
        debug!("Removing {} (not in revision)", name);
        fs::remove_file(dir.join(name)).with_context(|| format!("Failed to remove {}", name))?;
    }

    Ok(revised.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeset_studio::mock::{sample_files, sample_proposal};
    use codeset_studio::response::parse_file_set;
    use codeset_studio::{FileRecord, MockGateway};

    #[tokio::test]
    async fn test_revision_replaces_files_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        sample_files().write_to_dir(temp.path()).unwrap();
        fs::write(temp.path().join(DEPLOY_FILE_NAME), "<html>v1</html>").unwrap();

        let replacement = FileSet::new(vec![
            FileRecord::new("App.tsx", "blue app"),
            FileRecord::new("theme.css", ":root { --accent: blue; }"),
        ])
        .unwrap();
        let gateway = MockGateway::new().add_revision(Ok(replacement));

        let count = revise_dir(
            Arc::new(gateway.clone()),
            sample_proposal("Torra"),
            temp.path(),
            "make it blue",
        )
        .await
        .unwrap();

        assert_eq!(count, 2);
        assert!(!temp.path().join("Home.tsx").exists());
        assert!(!temp.path().join("global.css").exists());
        assert_eq!(fs::read_to_string(temp.path().join("App.tsx")).unwrap(), "blue app");
        assert_eq!(
            fs::read_to_string(temp.path().join(DEPLOY_FILE_NAME)).unwrap(),
            "<html>v1</html>"
        );

        let call = &gateway.get_method_calls("revise_files")[0];
        assert_eq!(call.files, vec!["App.tsx", "Home.tsx", "global.css"]);
    }

    #[tokio::test]
    async fn test_failed_revision_leaves_directory() {
        let temp = tempfile::tempdir().unwrap();
        sample_files().write_to_dir(temp.path()).unwrap();
        let gateway = MockGateway::new().simulate_failure("timeout");

        let result = revise_dir(Arc::new(gateway), sample_proposal("Torra"), temp.path(), "x").await;

        assert!(result.is_err());
        assert!(temp.path().join("Home.tsx").exists());
    }

    #[tokio::test]
    async fn test_unsafe_revision_leaves_directory() {
        let temp = tempfile::tempdir().unwrap();
        sample_files().write_to_dir(temp.path()).unwrap();
        let payload = serde_json::json!({
            "files": [
                {"name": "App.tsx", "content": "new"},
                {"name": "../escape.css", "content": "body{}"}
            ]
        })
        .to_string();
        let gateway = MockGateway::new().add_revision(parse_file_set(&payload));

        let result = revise_dir(Arc::new(gateway), sample_proposal("Torra"), temp.path(), "x").await;

        assert!(result.is_err());
        assert!(temp.path().join("Home.tsx").exists());
        assert!(temp.path().join("global.css").exists());
        assert!(!temp.path().parent().unwrap().join("escape.css").exists());
        assert_ne!(fs::read_to_string(temp.path().join("App.tsx")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_write_failure_keeps_dropped_files() {
        let temp = tempfile::tempdir().unwrap();
        sample_files().write_to_dir(temp.path()).unwrap();
        fs::create_dir(temp.path().join("assets")).unwrap();
        fs::write(temp.path().join("assets/brand.css"), "a {}").unwrap();

        // "assets" exists as a directory, so writing it as a file fails.
        let replacement = FileSet::new(vec![
            FileRecord::new("assets", "not a directory"),
            FileRecord::new("App.tsx", "new"),
        ])
        .unwrap();
        let gateway = MockGateway::new().add_revision(Ok(replacement));

        let result = revise_dir(Arc::new(gateway), sample_proposal("Torra"), temp.path(), "x").await;

        assert!(result.is_err());
        assert!(temp.path().join("Home.tsx").exists());
        assert!(temp.path().join("global.css").exists());
        assert!(temp.path().join("assets/brand.css").exists());
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let temp = tempfile::tempdir().unwrap();
        let result = revise_dir(
            Arc::new(MockGateway::new()),
            sample_proposal("Torra"),
            &temp.path().join("nope"),
            "x",
        )
        .await;
        assert!(result.is_err());
    }
}
