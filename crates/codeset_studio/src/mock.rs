//! Mock generation gateway for testing.
//!
//! Provides a scripted implementation of [`GenerationGateway`] so sessions,
//! workspaces and the CLI can be exercised without the generation service.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::error::{StudioError, StudioResult};
use crate::files::{FileRecord, FileSet, GeneratedSite};
use crate::gateway::GenerationGateway;
use crate::pcm::encode_base64_pcm16;
use crate::types::{AudioClip, ImageRef, PageOutline, Proposal};

/// A proposal fixture for `business_name`.
pub fn sample_proposal(business_name: &str) -> Proposal {
    Proposal {
        business_name: business_name.to_string(),
        target_audience: "Specialty coffee drinkers".to_string(),
        suggested_style: "Warm minimalism".to_string(),
        pages: vec![
            PageOutline {
                title: "Home".to_string(),
                description: "Story and signature roasts".to_string(),
                sections: vec!["Hero".to_string(), "Roasts".to_string()],
            },
            PageOutline {
                title: "Visit".to_string(),
                description: "Opening hours and map".to_string(),
                sections: vec!["Map".to_string()],
            },
        ],
        color_palette: vec!["#3b2314".to_string(), "#f4ede4".to_string()],
        copy_concepts: vec!["Roasted by the river".to_string()],
        market_insights: "Direct-trade origin stories convert well".to_string(),
    }
}

/// Source files produced by the default generation response.
pub fn sample_files() -> FileSet {
    FileSet::new(vec![
        FileRecord::new("App.tsx", "import Home from './Home';\nexport default () => <Home />;"),
        FileRecord::new("Home.tsx", "export default () => <main>Welcome</main>;"),
        FileRecord::new("global.css", "body { margin: 0; font-family: serif; }"),
    ])
    .unwrap_or_default()
}

/// A generated site fixture.
pub fn sample_site() -> GeneratedSite {
    GeneratedSite {
        source_files: sample_files(),
        preview_document: "<!doctype html><html><body><h1>Welcome</h1></body></html>".to_string(),
    }
}

/// A 1x1 PNG fixture.
pub fn sample_image() -> ImageRef {
    ImageRef {
        mime_type: "image/png".to_string(),
        data: "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==".to_string(),
    }
}

/// A short 24 kHz narration fixture.
pub fn sample_audio() -> AudioClip {
    AudioClip {
        mime_type: "audio/pcm;rate=24000".to_string(),
        data: encode_base64_pcm16(&[0.0, 0.25, -0.25, 0.5]),
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    /// Brief, business name, instruction or prompt, depending on the method
    pub input: String,
    /// Names of the files sent with a revision
    pub files: Vec<String>,
}

/// Scripted gateway for tests.
///
/// Each capability pops its next scripted result; once a queue is empty the
/// fixture above is returned. Calls are captured for later assertions.
#[derive(Clone, Default)]
pub struct MockGateway {
    proposals: Arc<RwLock<VecDeque<StudioResult<Proposal>>>>,
    sites: Arc<RwLock<VecDeque<StudioResult<GeneratedSite>>>>,
    revisions: Arc<RwLock<VecDeque<StudioResult<FileSet>>>>,
    assets: Arc<RwLock<VecDeque<StudioResult<ImageRef>>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
    gate: Arc<RwLock<Option<Arc<Notify>>>>,
}

impl MockGateway {
    /// Create a new mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next `propose_website` result.
    pub fn add_proposal(self, result: StudioResult<Proposal>) -> Self {
        self.proposals.write().push_back(result);
        self
    }

    /// Queue the next `generate_files` result.
    pub fn add_site(self, result: StudioResult<GeneratedSite>) -> Self {
        self.sites.write().push_back(result);
        self
    }

    /// Queue the next `revise_files` result.
    pub fn add_revision(self, result: StudioResult<FileSet>) -> Self {
        self.revisions.write().push_back(result);
        self
    }

    /// Queue the next `synthesize_asset` result.
    pub fn add_asset(self, result: StudioResult<ImageRef>) -> Self {
        self.assets.write().push_back(result);
        self
    }

    /// Fail every call with an upstream error.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Hold `generate_files` and `revise_files` until `gate` is notified.
    pub fn hold_until(self, gate: Arc<Notify>) -> Self {
        *self.gate.write() = Some(gate);
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    fn record_call(&self, method: &str, input: &str, files: Vec<String>) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            input: input.to_string(),
            files,
        });
    }

    fn check_failure(&self) -> StudioResult<()> {
        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(StudioError::Upstream(msg));
        }
        Ok(())
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.read().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

fn next_or<T>(queue: &RwLock<VecDeque<StudioResult<T>>>, fallback: impl FnOnce() -> T) -> StudioResult<T> {
    queue.write().pop_front().unwrap_or_else(|| Ok(fallback()))
}

#[async_trait]
impl GenerationGateway for MockGateway {
    async fn propose_website(&self, brief: &str) -> StudioResult<Proposal> {
        self.record_call("propose_website", brief, Vec::new());
        self.check_failure()?;
        next_or(&self.proposals, || sample_proposal("Torra Coffee Roasters"))
    }

    async fn generate_files(&self, proposal: &Proposal) -> StudioResult<GeneratedSite> {
        self.record_call("generate_files", &proposal.business_name, Vec::new());
        self.wait_for_gate().await;
        self.check_failure()?;
        next_or(&self.sites, sample_site)
    }

    async fn revise_files(
        &self,
        _proposal: &Proposal,
        files: &FileSet,
        instruction: &str,
    ) -> StudioResult<FileSet> {
        let names = files.names().into_iter().map(String::from).collect();
        self.record_call("revise_files", instruction, names);
        self.wait_for_gate().await;
        self.check_failure()?;
        next_or(&self.revisions, || files.clone())
    }

    async fn synthesize_asset(&self, prompt: &str) -> StudioResult<ImageRef> {
        self.record_call("synthesize_asset", prompt, Vec::new());
        self.check_failure()?;
        next_or(&self.assets, sample_image)
    }

    async fn synthesize_strategy_audio(&self, proposal: &Proposal) -> StudioResult<AudioClip> {
        self.record_call("synthesize_strategy_audio", &proposal.business_name, Vec::new());
        self.check_failure()?;
        Ok(sample_audio())
    }
}
