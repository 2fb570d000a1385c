//! Video render poller.
//!
//! Submits one long-running video generation, polls it on a fixed interval
//! and fetches the finished asset. Every stage is a single request; a failure
//! anywhere ends the job with [`StudioError::RenderFailed`] and no partial
//! output.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};

/// A submitted render, as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    /// Operation handle used for polling
    pub operation: String,
    pub done: bool,
    pub result_uri: Option<String>,
}

impl RenderJob {
    pub fn pending(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            done: false,
            result_uri: None,
        }
    }
}

/// Finished video asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedVideo {
    pub uri: String,
    pub bytes: Vec<u8>,
    /// Status checks issued before completion
    pub polls: u32,
}

/// The three calls of a long-running render.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Issue the creation request.
    async fn submit(&self, prompt: &str) -> StudioResult<RenderJob>;

    /// One idempotent status check.
    async fn poll(&self, job: &RenderJob) -> StudioResult<RenderJob>;

    /// Download the finished asset.
    async fn fetch(&self, uri: &str) -> StudioResult<Vec<u8>>;
}

/// Prompt for a brand launch video.
pub fn launch_prompt(business_name: &str) -> String {
    format!("{} branding video", business_name)
}

/// Drives a [`VideoBackend`] from submission to fetched bytes.
pub struct VideoRenderPoller {
    backend: Arc<dyn VideoBackend>,
    interval: Duration,
    max_polls: Option<u32>,
}

impl VideoRenderPoller {
    pub fn new(backend: Arc<dyn VideoBackend>, interval: Duration) -> Self {
        Self {
            backend,
            interval,
            max_polls: None,
        }
    }

    /// Give up with `RenderFailed` after `max` status checks.
    pub fn with_max_polls(mut self, max: u32) -> Self {
        self.max_polls = Some(max);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Render `prompt` and return the fetched asset.
    pub async fn render(&self, prompt: &str) -> StudioResult<RenderedVideo> {
        let mut job = self
            .backend
            .submit(prompt)
            .await
            .map_err(|e| stage_failed("submission", e))?;
        info!("Video render submitted: {}", job.operation);

        let mut polls = 0u32;
        while !job.done {
            if let Some(max) = self.max_polls {
                if polls >= max {
                    warn!("Video render {} still pending after {} polls", job.operation, polls);
                    return Err(StudioError::RenderFailed(format!(
                        "render did not finish after {} status checks",
                        polls
                    )));
                }
            }
            tokio::time::sleep(self.interval).await;
            job = self
                .backend
                .poll(&job)
                .await
                .map_err(|e| stage_failed("polling", e))?;
            polls += 1;
            debug!("Video render poll #{}: done={}", polls, job.done);
        }

        let uri = job.result_uri.clone().ok_or_else(|| {
            StudioError::RenderFailed("render finished without a result uri".to_string())
        })?;
        let bytes = self
            .backend
            .fetch(&uri)
            .await
            .map_err(|e| stage_failed("fetch", e))?;
        info!("Video render fetched: {} bytes after {} polls", bytes.len(), polls);

        Ok(RenderedVideo { uri, bytes, polls })
    }
}

fn stage_failed(stage: &str, err: StudioError) -> StudioError {
    match err {
        StudioError::RenderFailed(msg) => StudioError::RenderFailed(format!("{}: {}", stage, msg)),
        other => StudioError::RenderFailed(format!("{}: {}", stage, other)),
    }
}

/// Append the access credential to an asset uri.
pub fn with_access_key(uri: &str, api_key: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}key={}", uri, separator, api_key)
}

/// Video backend on the Gemini long-running prediction API.
pub struct GeminiVideoBackend {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiVideoBackend {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &StudioConfig) -> StudioResult<Self> {
        let key = config.require_api_key()?;
        Ok(Self::new(key, config.api_base.clone(), config.models.video.clone()))
    }

    async fn read_operation(response: reqwest::Response) -> StudioResult<Operation> {
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(StudioError::Upstream(format!(
                "video api error ({}): {}",
                status, body
            )));
        }
        response
            .json::<Operation>()
            .await
            .map_err(|e| StudioError::malformed(format!("failed to decode operation: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<Value>,
}

impl Operation {
    fn into_job(self) -> StudioResult<RenderJob> {
        if let Some(error) = self.error {
            return Err(StudioError::RenderFailed(error.message));
        }
        let result_uri = self
            .response
            .as_ref()
            .and_then(|r| r.pointer("/generateVideoResponse/generatedSamples/0/video/uri"))
            .and_then(Value::as_str)
            .map(String::from);
        Ok(RenderJob {
            operation: self.name,
            done: self.done,
            result_uri,
        })
    }
}

#[async_trait]
impl VideoBackend for GeminiVideoBackend {
    async fn submit(&self, prompt: &str) -> StudioResult<RenderJob> {
        let url = format!("{}/models/{}:predictLongRunning", self.api_base, self.model);
        debug!("POST {}", url);
        let body = json!({
            "instances": [{
                "prompt": format!("Cinematic brand launch video, high production value, 4k: {}", prompt)
            }],
            "parameters": { "aspectRatio": "16:9", "resolution": "720p" }
        });
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        Self::read_operation(response).await?.into_job()
    }

    async fn poll(&self, job: &RenderJob) -> StudioResult<RenderJob> {
        let url = format!("{}/{}", self.api_base, job.operation);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        Self::read_operation(response).await?.into_job()
    }

    async fn fetch(&self, uri: &str) -> StudioResult<Vec<u8>> {
        let response = self.client.get(with_access_key(uri, &self.api_key)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StudioError::Upstream(format!("asset fetch failed ({})", status)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn poller(backend: MockVideoBackend) -> VideoRenderPoller {
        VideoRenderPoller::new(Arc::new(backend), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_polls_until_done_then_fetches_once() {
        let mut backend = MockVideoBackend::new();
        let mut seq = Sequence::new();

        backend
            .expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RenderJob::pending("operations/abc")));
        backend
            .expect_poll()
            .times(3)
            .in_sequence(&mut seq)
            .returning(|job| Ok(job.clone()));
        backend
            .expect_poll()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|job| {
                Ok(RenderJob {
                    operation: job.operation.clone(),
                    done: true,
                    result_uri: Some("https://files/v.mp4?alt=media".to_string()),
                })
            });
        backend
            .expect_fetch()
            .with(eq("https://files/v.mp4?alt=media"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![0, 0, 0, 0x18]));

        let video = poller(backend).render("Torra branding video").await.unwrap();

        assert_eq!(video.polls, 4);
        assert_eq!(video.bytes, vec![0, 0, 0, 0x18]);
    }

    #[tokio::test]
    async fn test_submit_failure_is_render_failed() {
        let mut backend = MockVideoBackend::new();
        backend
            .expect_submit()
            .returning(|_| Err(StudioError::Upstream("quota".into())));
        backend.expect_poll().never();
        backend.expect_fetch().never();

        let err = poller(backend).render("x").await.unwrap_err();
        assert!(matches!(err, StudioError::RenderFailed(ref m) if m.starts_with("submission")));
    }

    #[tokio::test]
    async fn test_poll_failure_stops_job() {
        let mut backend = MockVideoBackend::new();
        backend
            .expect_submit()
            .returning(|_| Ok(RenderJob::pending("operations/abc")));
        backend
            .expect_poll()
            .times(1)
            .returning(|_| Err(StudioError::RenderFailed("safety filter".into())));
        backend.expect_fetch().never();

        let err = poller(backend).render("x").await.unwrap_err();
        assert_eq!(err.to_string(), "Render failed: polling: safety filter");
    }

    #[tokio::test]
    async fn test_done_without_uri() {
        let mut backend = MockVideoBackend::new();
        backend.expect_submit().returning(|_| {
            Ok(RenderJob {
                operation: "operations/abc".into(),
                done: true,
                result_uri: None,
            })
        });
        backend.expect_poll().never();
        backend.expect_fetch().never();

        assert!(matches!(
            poller(backend).render("x").await,
            Err(StudioError::RenderFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_max_polls() {
        let mut backend = MockVideoBackend::new();
        backend
            .expect_submit()
            .returning(|_| Ok(RenderJob::pending("operations/abc")));
        backend.expect_poll().times(2).returning(|job| Ok(job.clone()));
        backend.expect_fetch().never();

        let err = poller(backend).with_max_polls(2).render("x").await.unwrap_err();
        assert!(err.to_string().contains("after 2 status checks"));
    }

    #[test]
    fn test_operation_into_job() {
        let op: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/1",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": "https://u"}}]}}
        }))
        .unwrap();
        let job = op.into_job().unwrap();
        assert!(job.done);
        assert_eq!(job.result_uri.as_deref(), Some("https://u"));

        let failed: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/2",
            "done": true,
            "error": {"code": 400, "message": "prompt rejected"}
        }))
        .unwrap();
        assert!(matches!(failed.into_job(), Err(StudioError::RenderFailed(m)) if m == "prompt rejected"));
    }

    #[test]
    fn test_with_access_key() {
        assert_eq!(with_access_key("https://f/v?alt=media", "k"), "https://f/v?alt=media&key=k");
        assert_eq!(with_access_key("https://f/v", "k"), "https://f/v?key=k");
        assert_eq!(launch_prompt("Torra"), "Torra branding video");
    }
}
