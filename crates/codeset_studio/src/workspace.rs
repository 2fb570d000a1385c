//! Workspace view model.
//!
//! Renders a [`BuildSession`] as tabs and forwards user actions back into
//! it. Asset, consultation and launch progress is narrated into the
//! session's activity log.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::oneshot;
use tracing::info;

use crate::error::{StudioError, StudioResult};
use crate::files::FileRecord;
use crate::session::BuildSession;
use crate::types::{ImageRef, Proposal};
use crate::video::{launch_prompt, RenderedVideo, VideoRenderPoller};
use crate::voice::{consultant_instruction, AudioCapture, LiveVoiceBridge, PlaybackSink, VoiceOutcome};

/// File name of the deployed preview.
pub const DEPLOY_FILE_NAME: &str = "index.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkspaceTab {
    #[default]
    Source,
    Assets,
    Consultant,
    Launch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorView {
    #[default]
    Code,
    Preview,
}

/// UI state layered over one build session.
pub struct WorkspaceView {
    session: BuildSession,
    tab: WorkspaceTab,
    view: EditorView,
    active_file: usize,
    assets: Vec<ImageRef>,
    launch_video: Option<RenderedVideo>,
}

impl WorkspaceView {
    pub fn new(session: BuildSession) -> Self {
        Self {
            session,
            tab: WorkspaceTab::default(),
            view: EditorView::default(),
            active_file: 0,
            assets: Vec::new(),
            launch_video: None,
        }
    }

    pub fn session(&self) -> &BuildSession {
        &self.session
    }

    pub fn tab(&self) -> WorkspaceTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: WorkspaceTab) {
        self.tab = tab;
    }

    pub fn view(&self) -> EditorView {
        self.view
    }

    pub fn set_view(&mut self, view: EditorView) {
        self.view = view;
    }

    /// Index of the file shown in the editor, clamped to the current file set.
    pub fn active_file_index(&self) -> usize {
        let len = self.session.files().len();
        self.active_file.min(len.saturating_sub(1))
    }

    pub fn select_file(&mut self, index: usize) {
        self.active_file = index;
    }

    pub fn active_file(&self) -> Option<FileRecord> {
        self.session.files().get(self.active_file_index()).cloned()
    }

    /// What the editor pane shows: the active file's source or the preview.
    pub fn visible_content(&self) -> String {
        match self.view {
            EditorView::Code => self.active_file().map(|f| f.content).unwrap_or_default(),
            EditorView::Preview => self.session.preview_document(),
        }
    }

    /// Replace the content of the active file.
    pub fn edit_active(&self, content: impl Into<String>) -> StudioResult<()> {
        self.session.edit_file(self.active_file_index(), content)
    }

    pub async fn request_revision(&self, instruction: &str) -> StudioResult<()> {
        self.session.request_revision(instruction).await
    }

    /// Generated assets, newest first.
    pub fn assets(&self) -> &[ImageRef] {
        &self.assets
    }

    /// Request a brand visual. An empty prompt is ignored.
    pub async fn generate_asset(&mut self, prompt: &str) -> StudioResult<Option<ImageRef>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(None);
        }
        self.session
            .note(format!("Assets: Requesting brand visual for \"{}\"...", prompt));
        match self.session.gateway().synthesize_asset(prompt).await {
            Ok(image) => {
                self.assets.insert(0, image.clone());
                self.session.note("Assets: Visual identity synthesized.");
                Ok(Some(image))
            }
            Err(e) => {
                self.session.note(format!("Assets: Error synthesizing visual. {}", e));
                Err(e)
            }
        }
    }

    pub fn launch_video(&self) -> Option<&RenderedVideo> {
        self.launch_video.as_ref()
    }

    /// Render the launch video for the active proposal.
    pub async fn render_launch_video(&mut self, poller: &VideoRenderPoller) -> StudioResult<&RenderedVideo> {
        let proposal = self.require_proposal("render_launch_video")?;
        self.session
            .note("Launch: Initiating Veo 3.1 high-quality video generation...");
        match poller.render(&launch_prompt(&proposal.business_name)).await {
            Ok(video) => {
                self.session.note("Launch: Professional brand video synthesized.");
                let video = &*self.launch_video.insert(video);
                Ok(video)
            }
            Err(e) => {
                self.session.note("Launch: Error generating video.");
                Err(e)
            }
        }
    }

    /// Hold a live voice consultation about the active proposal.
    pub async fn consult(
        &self,
        bridge: &mut LiveVoiceBridge,
        capture: &mut dyn AudioCapture,
        sink: &mut dyn PlaybackSink,
        shutdown: oneshot::Receiver<()>,
    ) -> StudioResult<VoiceOutcome> {
        let proposal = self.require_proposal("consult")?;
        self.session.note("Consultant: Opening Live native audio session...");
        let outcome = bridge
            .run(&consultant_instruction(&proposal), capture, sink, shutdown)
            .await;
        let message = match &outcome {
            VoiceOutcome::ReconnectRequired(reason) => {
                format!("Consultant: Connection lost ({}). Reconnect to continue.", reason)
            }
            _ => "Consultant: Session closed.".to_string(),
        };
        self.session.note(message);
        Ok(outcome)
    }

    /// Write the preview document to `dir` as `index.html`.
    pub fn deploy(&self, dir: &Path) -> StudioResult<PathBuf> {
        let preview = self.session.preview_document();
        if preview.is_empty() {
            return Err(StudioError::InvalidState {
                current: self.session.status().to_string(),
                expected: "a generated preview".to_string(),
                operation: "deploy".to_string(),
            });
        }
        fs::create_dir_all(dir)?;
        let target = dir.join(DEPLOY_FILE_NAME);
        fs::write(&target, preview)?;
        info!("Deployed preview to {}", target.display());
        Ok(target)
    }

    fn require_proposal(&self, operation: &str) -> StudioResult<Proposal> {
        self.session.proposal().ok_or_else(|| StudioError::InvalidState {
            current: self.session.status().to_string(),
            expected: "active proposal".to_string(),
            operation: operation.to_string(),
        })
    }
}
