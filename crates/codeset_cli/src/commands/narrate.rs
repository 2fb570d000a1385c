//! Narrate command - Two-voice audio summary of the active project.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use codeset_studio::pcm::{self, OUTPUT_SAMPLE_RATE};
use codeset_studio::{GeminiGateway, GenerationGateway, Proposal, StudioConfig};

use super::load_active_project;

#[derive(Args)]
pub struct NarrateArgs {
    /// WAV file to write
    #[arg(short, long, default_value = "strategy.wav")]
    out: PathBuf,
}

pub async fn execute(args: NarrateArgs, config: StudioConfig) -> Result<()> {
    let proposal = load_active_project(&config)?;
    let gateway = GeminiGateway::from_config(&config)?;

    let seconds = narrate_to(&gateway, &proposal, &args.out).await?;

    println!("✅ Narration saved: {} ({:.1}s)", args.out.display(), seconds);
    Ok(())
}

/// Synthesize the strategy narration and write it as WAV. Returns the duration in seconds.
pub async fn narrate_to(gateway: &dyn GenerationGateway, proposal: &Proposal, out: &Path) -> Result<f64> {
    let clip = gateway
        .synthesize_strategy_audio(proposal)
        .await
        .context("Narration failed")?;
    let samples = clip.samples()?;
    let rate = pcm::rate_from_mime(&clip.mime_type).unwrap_or_else(|| {
        warn!("No sample rate in {}; assuming {} Hz", clip.mime_type, OUTPUT_SAMPLE_RATE);
        OUTPUT_SAMPLE_RATE
    });

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, pcm::wav_bytes(&pcm::encode_pcm16(&samples), rate))
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!("Wrote {} samples at {} Hz to {}", samples.len(), rate, out.display());

    Ok(pcm::duration_secs(samples.len(), rate))
}
