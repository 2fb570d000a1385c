//! Generation gateway.
//!
//! A thin adapter over the generative-AI service. Each capability is exactly
//! one request/response round trip: no retries, caching or batching. Retry is
//! always a caller decision.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{ModelConfig, StudioConfig};
use crate::error::{StudioError, StudioResult};
use crate::files::{FileSet, GeneratedSite};
use crate::response::{parse_file_set, parse_generated_site, parse_proposal, proposal_schema};
use crate::types::{AudioClip, ImageRef, Proposal};

/// Upper bound on one generation round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Capabilities the studio needs from the generation service.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Plan a website from a free-text brief.
    async fn propose_website(&self, brief: &str) -> StudioResult<Proposal>;

    /// Generate the initial source files and preview document for a proposal.
    async fn generate_files(&self, proposal: &Proposal) -> StudioResult<GeneratedSite>;

    /// Produce a complete replacement file set for the given instruction.
    async fn revise_files(
        &self,
        proposal: &Proposal,
        files: &FileSet,
        instruction: &str,
    ) -> StudioResult<FileSet>;

    /// Synthesize a brand image.
    async fn synthesize_asset(&self, prompt: &str) -> StudioResult<ImageRef>;

    /// Narrate the proposal as a short two-speaker strategy summary.
    async fn synthesize_strategy_audio(&self, proposal: &Proposal) -> StudioResult<AudioClip>;
}

/// Prompt for the planning step.
pub fn proposal_prompt(brief: &str) -> String {
    format!(
        "Act as a senior web design consultant at \"Code-Set\". Create a comprehensive website \
         proposal for: \"{}\". Use Google Search to find current design trends and competitor \
         strategies for this niche.",
        brief
    )
}

/// Prompt for the initial file generation.
pub fn build_prompt(proposal: &Proposal) -> String {
    let proposal_json = serde_json::to_string_pretty(proposal).unwrap_or_default();
    format!(
        "You are the lead architect at Code-Set. Generate a modern website for {name}.\n\
         PROPOSAL:\n{proposal}\n\n\
         Return exactly 4 files as JSON of the form \
         {{\"files\": [{{\"name\": string, \"content\": string, \"language\": string}}]}}: \
         App.tsx, Home.tsx, global.css and preview.html. preview.html must be a standalone \
         document that renders the site without a build step.",
        name = proposal.business_name,
        proposal = proposal_json
    )
}

/// Prompt for a revision of the current files.
pub fn revision_prompt(proposal: &Proposal, files: &FileSet, instruction: &str) -> String {
    let listing: String = files
        .iter()
        .map(|f| format!("\nFILE: {}\n{}", f.name, f.content))
        .collect();
    format!(
        "You are the lead developer at Code-Set. Update the code for {name}.\n\
         Request: \"{instruction}\".\n\
         Return the complete updated project as JSON of the form \
         {{\"files\": [{{\"name\": string, \"content\": string, \"language\": string}}]}}. \
         Every file that should remain must be included; include preview.html if the preview changes.\n\
         FILES:{listing}",
        name = proposal.business_name,
        instruction = instruction,
        listing = listing
    )
}

/// Prompt for an image asset.
pub fn asset_prompt(prompt: &str) -> String {
    format!(
        "High-end commercial photography, professional lighting, minimal: {}",
        prompt
    )
}

/// Script for the narrated strategy summary.
pub fn narration_script(proposal: &Proposal) -> String {
    format!(
        "TTS the following conversation between an Architect (Joe) and a Client Manager (Jane) \
         about the project \"{name}\":\n\
         Joe: I've finalized the architectural roadmap for {name}. We are going with a {style} aesthetic.\n\
         Jane: Excellent. The market insights suggest the target audience of {audience} is looking \
         for exactly that. Let's push to production.",
        name = proposal.business_name,
        style = proposal.suggested_style,
        audience = proposal.target_audience
    )
}

/// Gateway backed by the Gemini REST API.
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    models: ModelConfig,
    search_grounding: bool,
}

impl GeminiGateway {
    /// Create a gateway with explicit settings.
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        models: ModelConfig,
    ) -> StudioResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StudioError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            models,
            search_grounding: true,
        })
    }

    /// Create a gateway from studio configuration.
    pub fn from_config(config: &StudioConfig) -> StudioResult<Self> {
        let key = config.require_api_key()?;
        Ok(Self::new(key, config.api_base.clone(), config.models.clone())?
            .with_search_grounding(config.search_grounding))
    }

    /// Toggle web-search grounding for proposals.
    pub fn with_search_grounding(mut self, enabled: bool) -> Self {
        self.search_grounding = enabled;
        self
    }

    pub fn models(&self) -> &ModelConfig {
        &self.models
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> StudioResult<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(StudioError::Upstream(format!(
                "gemini api error ({}): {}",
                status, body
            )));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| StudioError::malformed(format!("failed to decode response envelope: {}", e)))
    }
}

#[async_trait]
impl GenerationGateway for GeminiGateway {
    async fn propose_website(&self, brief: &str) -> StudioResult<Proposal> {
        info!("Requesting website proposal");
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(proposal_prompt(brief))],
            generation_config: Some(GenerationConfig::json(Some(proposal_schema()))),
            tools: self
                .search_grounding
                .then(|| vec![json!({ "googleSearch": {} })]),
        };
        let response = self.generate_content(&self.models.planner, &request).await?;
        parse_proposal(&response.text())
    }

    async fn generate_files(&self, proposal: &Proposal) -> StudioResult<GeneratedSite> {
        info!("Requesting initial files for {}", proposal.business_name);
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(build_prompt(proposal))],
            generation_config: Some(GenerationConfig::json(None)),
            tools: None,
        };
        let response = self.generate_content(&self.models.builder, &request).await?;
        parse_generated_site(&response.text())
    }

    async fn revise_files(
        &self,
        proposal: &Proposal,
        files: &FileSet,
        instruction: &str,
    ) -> StudioResult<FileSet> {
        info!("Requesting revision of {} files", files.len());
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(revision_prompt(proposal, files, instruction))],
            generation_config: Some(GenerationConfig::json(None)),
            tools: None,
        };
        let response = self.generate_content(&self.models.builder, &request).await?;
        parse_file_set(&response.text())
    }

    async fn synthesize_asset(&self, prompt: &str) -> StudioResult<ImageRef> {
        info!("Requesting brand asset");
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(asset_prompt(prompt))],
            generation_config: None,
            tools: None,
        };
        let response = self.generate_content(&self.models.image, &request).await?;
        let inline = response
            .first_inline_data()
            .ok_or_else(|| StudioError::NoAssetProduced("response contains no image part".to_string()))?;
        Ok(ImageRef {
            mime_type: inline.mime_type.clone(),
            data: inline.data.clone(),
        })
    }

    async fn synthesize_strategy_audio(&self, proposal: &Proposal) -> StudioResult<AudioClip> {
        info!("Requesting strategy narration for {}", proposal.business_name);
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(narration_script(proposal))],
            generation_config: Some(GenerationConfig::speech(&[("Joe", "Kore"), ("Jane", "Puck")])),
            tools: None,
        };
        let response = self.generate_content(&self.models.tts, &request).await?;
        let inline = response
            .first_inline_data()
            .ok_or_else(|| StudioError::NoAssetProduced("response contains no audio part".to_string()))?;
        Ok(AudioClip {
            mime_type: inline.mime_type.clone(),
            data: inline.data.clone(),
        })
    }
}

// ============================================================
// Gemini API Types
// ============================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<RequestPart>,
}

impl Content {
    fn user_text(text: String) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![RequestPart { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<Value>,
}

impl GenerationConfig {
    fn json(schema: Option<Value>) -> Self {
        Self {
            response_mime_type: Some("application/json".to_string()),
            response_json_schema: schema,
            response_modalities: None,
            speech_config: None,
        }
    }

    fn speech(speakers: &[(&str, &str)]) -> Self {
        let voices: Vec<Value> = speakers
            .iter()
            .map(|(speaker, voice)| {
                json!({
                    "speaker": speaker,
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
                })
            })
            .collect();
        Self {
            response_mime_type: None,
            response_json_schema: None,
            response_modalities: Some(vec!["AUDIO".to_string()]),
            speech_config: Some(json!({
                "multiSpeakerVoiceConfig": { "speakerVoiceConfigs": voices }
            })),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    /// Concatenated non-thought text of the first candidate.
    fn text(&self) -> String {
        self.parts()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    fn first_inline_data(&self) -> Option<&InlineData> {
        self.parts().find_map(|p| p.inline_data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileRecord;

    fn proposal() -> Proposal {
        serde_json::from_value(json!({
            "businessName": "Torra",
            "targetAudience": "Coffee lovers",
            "suggestedStyle": "Warm minimalism",
            "pages": [{"title": "Home", "description": "Landing", "sections": ["Hero"]}],
            "colorPalette": [],
            "copyConcepts": []
        }))
        .unwrap()
    }

    #[test]
    fn test_gateway_construction() {
        let gateway = GeminiGateway::new("key", "https://example.test/v1beta/", ModelConfig::default()).unwrap();
        assert_eq!(gateway.api_base, "https://example.test/v1beta");
        assert!(gateway.search_grounding);

        let err = GeminiGateway::from_config(&StudioConfig::default()).map(|_| ()).unwrap_err();
        assert!(matches!(err, StudioError::NotConfigured));

        let config = StudioConfig {
            search_grounding: false,
            ..StudioConfig::default()
        }
        .with_api_key("key");
        assert!(!GeminiGateway::from_config(&config).unwrap().search_grounding);
    }

    #[test]
    fn test_response_text_skips_thoughts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"text": "{\"a\":"},
                        {"text": "1}"}
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(response.text(), "{\"a\":1}");
        assert!(response.first_inline_data().is_none());
    }

    #[test]
    fn test_response_inline_data() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "aGk="}}
                    ]
                }
            }]
        }))
        .unwrap();

        let inline = response.first_inline_data().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "aGk=");
    }

    #[test]
    fn test_empty_candidates_yield_empty_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_proposal_request_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(proposal_prompt("bakery"))],
            generation_config: Some(GenerationConfig::json(Some(proposal_schema()))),
            tools: Some(vec![json!({ "googleSearch": {} })]),
        };
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseJsonSchema"]["type"], "object");
        assert!(body["generationConfig"].get("responseModalities").is_none());
        assert!(body["tools"][0].get("googleSearch").is_some());
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("\"bakery\""));
    }

    #[test]
    fn test_speech_config_shape() {
        let config = serde_json::to_value(GenerationConfig::speech(&[("Joe", "Kore")])).unwrap();
        assert_eq!(config["responseModalities"][0], "AUDIO");
        assert_eq!(
            config["speechConfig"]["multiSpeakerVoiceConfig"]["speakerVoiceConfigs"][0]["voiceConfig"]
                ["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
    }

    #[test]
    fn test_revision_prompt_lists_every_file() {
        let files = FileSet::new(vec![
            FileRecord::new("App.tsx", "app body"),
            FileRecord::new("global.css", "css body"),
        ])
        .unwrap();
        let prompt = revision_prompt(&proposal(), &files, "make it blue");

        assert!(prompt.contains("FILE: App.tsx\napp body"));
        assert!(prompt.contains("FILE: global.css\ncss body"));
        assert!(prompt.contains("\"make it blue\""));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = StudioConfig::default();
        assert!(matches!(
            GeminiGateway::from_config(&config),
            Err(StudioError::NotConfigured)
        ));
    }
}
