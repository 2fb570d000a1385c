//! Asset command - Synthesize a brand image.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use codeset_studio::{GeminiGateway, GenerationGateway, StudioConfig};

#[derive(Args)]
pub struct AssetArgs {
    /// Subject of the image
    prompt: String,

    /// File to write the image to
    #[arg(short, long, default_value = "asset.png")]
    out: PathBuf,
}

pub async fn execute(args: AssetArgs, config: StudioConfig) -> Result<()> {
    let gateway = GeminiGateway::from_config(&config)?;
    let (mime_type, size) = synthesize_to(&gateway, &args.prompt, &args.out).await?;

    println!("✅ Asset saved: {} ({}, {} bytes)", args.out.display(), mime_type, size);
    Ok(())
}

/// Synthesize an image and write its bytes to `out`. Returns the MIME type and size.
pub async fn synthesize_to(gateway: &dyn GenerationGateway, prompt: &str, out: &Path) -> Result<(String, usize)> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("Invalid argument: the prompt must not be empty");
    }

    let image = gateway
        .synthesize_asset(prompt)
        .await
        .context("Asset synthesis failed")?;
    let bytes = image.bytes()?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    info!("Wrote {} bytes of {} to {}", bytes.len(), image.mime_type, out.display());

    Ok((image.mime_type, bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeset_studio::{MockGateway, StudioError};

    #[tokio::test]
    async fn test_writes_decoded_image() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("brand/logo.png");
        let gateway = MockGateway::new();

        let (mime, size) = synthesize_to(&gateway, "ceramic mug", &out).await.unwrap();

        assert_eq!(mime, "image/png");
        let written = fs::read(&out).unwrap();
        assert_eq!(written.len(), size);
        assert_eq!(&written[1..4], b"PNG");
        assert_eq!(gateway.get_method_calls("synthesize_asset")[0].input, "ceramic mug");
    }

    #[tokio::test]
    async fn test_no_asset_writes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("logo.png");
        let gateway = MockGateway::new().add_asset(Err(StudioError::NoAssetProduced("no image part".into())));

        assert!(synthesize_to(&gateway, "mug", &out).await.is_err());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_empty_prompt() {
        let temp = tempfile::tempdir().unwrap();
        let gateway = MockGateway::new();
        assert!(synthesize_to(&gateway, " ", &temp.path().join("x.png")).await.is_err());
        assert_eq!(gateway.call_count(), 0);
    }
}
