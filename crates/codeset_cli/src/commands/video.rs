//! Video command - Render the launch video for the active project.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use codeset_studio::video::launch_prompt;
use codeset_studio::{GeminiVideoBackend, RenderedVideo, StudioConfig, VideoRenderPoller};

use super::load_active_project;

#[derive(Args)]
pub struct VideoArgs {
    /// File to write the video to
    #[arg(short, long, default_value = "launch.mp4")]
    out: PathBuf,

    /// Custom prompt instead of the project's launch prompt
    #[arg(long)]
    prompt: Option<String>,

    /// Give up after this many status checks
    #[arg(long)]
    max_polls: Option<u32>,
}

pub async fn execute(args: VideoArgs, config: StudioConfig) -> Result<()> {
    let prompt = match args.prompt {
        Some(prompt) => prompt,
        None => launch_prompt(&load_active_project(&config)?.business_name),
    };

    let backend = Arc::new(GeminiVideoBackend::from_config(&config)?);
    let mut poller = VideoRenderPoller::new(backend, config.video_poll_interval());
    if let Some(max) = args.max_polls {
        poller = poller.with_max_polls(max);
    }

    println!("🎬 Rendering \"{}\" (checking every {}s)...", prompt, poller.interval().as_secs());
    let video = render_to(&poller, &prompt, &args.out).await?;

    println!("✅ Video saved: {} ({} bytes)", args.out.display(), video.bytes.len());
    Ok(())
}

/// Render `prompt` and write the fetched bytes to `out`.
pub async fn render_to(poller: &VideoRenderPoller, prompt: &str, out: &Path) -> Result<RenderedVideo> {
    let video = poller.render(prompt).await.context("Video render failed")?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, &video.bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    info!("Video from {} written after {} polls", video.uri, video.polls);

    Ok(video)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use codeset_studio::{RenderJob, StudioError, StudioResult, VideoBackend};

    struct SlowBackend {
        polls_needed: u32,
        polls: AtomicU32,
    }

    #[async_trait]
    impl VideoBackend for SlowBackend {
        async fn submit(&self, _prompt: &str) -> StudioResult<RenderJob> {
            Ok(RenderJob::pending("operations/launch-1"))
        }

        async fn poll(&self, job: &RenderJob) -> StudioResult<RenderJob> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < self.polls_needed {
                return Ok(job.clone());
            }
            Ok(RenderJob {
                operation: job.operation.clone(),
                done: true,
                result_uri: Some("https://files.example/launch.mp4".to_string()),
            })
        }

        async fn fetch(&self, _uri: &str) -> StudioResult<Vec<u8>> {
            Ok(b"ftypmp42".to_vec())
        }
    }

    fn backend(polls_needed: u32) -> Arc<SlowBackend> {
        Arc::new(SlowBackend {
            polls_needed,
            polls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn test_render_writes_video() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("launch.mp4");
        let poller = VideoRenderPoller::new(backend(2), Duration::from_millis(1));

        let video = render_to(&poller, "Torra branding video", &out).await.unwrap();

        assert_eq!(video.polls, 2);
        assert_eq!(fs::read(&out).unwrap(), b"ftypmp42");
    }

    #[tokio::test]
    async fn test_max_polls_writes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("launch.mp4");
        let poller = VideoRenderPoller::new(backend(10), Duration::from_millis(1)).with_max_polls(3);

        let err = render_to(&poller, "x", &out).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StudioError>(),
            Some(StudioError::RenderFailed(_))
        ));
        assert!(!out.exists());
    }
}
