//! Build session state machine.
//!
//! A [`BuildSession`] coordinates one proposal's initial generation and the
//! revisions that follow. It is a cheap, cloneable handle: every clone sees
//! the same state, and at most one generation or revision is in flight at a
//! time across all clones.
//!
//! ```text
//! Idle ──start──▶ Generating ──ok──▶ Completed ──revise──▶ Revising
//!                     │                  ▲  ▲                  │
//!                     │   (lenient)      │  └──────────────────┘
//!                     ├──────────────────┘
//!                     └──(strict)──▶ Failed ──start──▶ Generating
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::FailurePolicy;
use crate::error::{StudioError, StudioResult};
use crate::files::{FileSet, GeneratedSite, PREVIEW_FILE_NAME};
use crate::gateway::GenerationGateway;
use crate::types::{ActivityLog, ActivityLogEntry, BuildStatus, Proposal};

/// Point-in-time copy of a session's state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: BuildStatus,
    pub proposal: Option<Proposal>,
    pub files: FileSet,
    pub preview_document: String,
    pub log: Vec<ActivityLogEntry>,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SessionState {
    id: Uuid,
    status: BuildStatus,
    proposal: Option<Proposal>,
    files: FileSet,
    preview_document: String,
    log: ActivityLog,
    last_error: Option<String>,
    updated_at: DateTime<Utc>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: BuildStatus::Idle,
            proposal: None,
            files: FileSet::empty(),
            preview_document: String::new(),
            log: ActivityLog::new(),
            last_error: None,
            updated_at: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Stateful coordinator for one build.
#[derive(Clone)]
pub struct BuildSession {
    state: Arc<Mutex<SessionState>>,
    gateway: Arc<dyn GenerationGateway>,
    policy: FailurePolicy,
}

impl BuildSession {
    /// Create an idle session backed by `gateway`.
    pub fn new(gateway: Arc<dyn GenerationGateway>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            gateway,
            policy: FailurePolicy::default(),
        }
    }

    /// Create a `Completed` session around files produced earlier, such as a
    /// build exported to disk and edited there.
    pub fn resume(gateway: Arc<dyn GenerationGateway>, proposal: Proposal, site: GeneratedSite) -> Self {
        let mut state = SessionState::new();
        state
            .log
            .push(format!("Engine: Resumed build for {}.", proposal.business_name));
        state.status = BuildStatus::Completed;
        state.proposal = Some(proposal);
        state.files = site.source_files;
        state.preview_document = site.preview_document;
        Self {
            state: Arc::new(Mutex::new(state)),
            gateway,
            policy: FailurePolicy::default(),
        }
    }

    /// Set how a failed initial generation is reported.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> Uuid {
        self.state.lock().id
    }

    /// Gateway this session generates through.
    pub fn gateway(&self) -> Arc<dyn GenerationGateway> {
        self.gateway.clone()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn status(&self) -> BuildStatus {
        self.state.lock().status
    }

    pub fn proposal(&self) -> Option<Proposal> {
        self.state.lock().proposal.clone()
    }

    pub fn files(&self) -> FileSet {
        self.state.lock().files.clone()
    }

    pub fn preview_document(&self) -> String {
        self.state.lock().preview_document.clone()
    }

    pub fn log(&self) -> Vec<ActivityLogEntry> {
        self.state.lock().log.entries().to_vec()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Copy of the whole session state, taken under one lock.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            id: state.id,
            status: state.status,
            proposal: state.proposal.clone(),
            files: state.files.clone(),
            preview_document: state.preview_document.clone(),
            log: state.log.entries().to_vec(),
            last_error: state.last_error.clone(),
            updated_at: state.updated_at,
        }
    }

    /// Append a line to the activity log.
    pub fn note(&self, message: impl Into<String>) {
        let mut state = self.state.lock();
        state.log.push(message);
        state.touch();
    }

    /// Start a build for `proposal`.
    ///
    /// Legal from `Idle`, `Completed` and `Failed`; any previous files and
    /// preview are discarded. Generation failures are absorbed into the
    /// session according to its [`FailurePolicy`], so the only error this
    /// returns is [`StudioError::Busy`]. Returns the status the build ended in.
    pub async fn start(&self, proposal: Proposal) -> StudioResult<BuildStatus> {
        {
            let mut state = self.state.lock();
            if state.status.is_busy() {
                debug!("Rejecting start while {}", state.status);
                return Err(StudioError::Busy(busy_label(state.status)));
            }
            state.status = BuildStatus::Generating;
            state.files = FileSet::empty();
            state.preview_document.clear();
            state.last_error = None;
            state.log.push(format!(
                "Engine: Initializing Autonomous Builder for {}...",
                proposal.business_name
            ));
            state.proposal = Some(proposal.clone());
            state.touch();
        }
        info!("Build {} generating for {}", self.id(), proposal.business_name);

        let result = self.gateway.generate_files(&proposal).await;

        let mut state = self.state.lock();
        match result {
            Ok(site) => {
                info!(
                    "Build generated {} files ({} bytes of preview)",
                    site.source_files.len(),
                    site.preview_document.len()
                );
                state.files = site.source_files;
                state.preview_document = site.preview_document;
                state.log.push("Success: Build logic verified. Site live.");
                state.status = BuildStatus::Completed;
            }
            Err(e) => {
                warn!("Build generation failed: {}", e);
                state.log.push(format!("Error: Build failed. {}", e));
                state.last_error = Some(e.to_string());
                state.status = match self.policy {
                    FailurePolicy::Lenient => BuildStatus::Completed,
                    FailurePolicy::Strict => BuildStatus::Failed,
                };
            }
        }
        state.touch();
        Ok(state.status)
    }

    /// Replace the file set with a revision produced from `instruction`.
    ///
    /// Legal only from `Completed`. The replacement is atomic: on failure the
    /// previous files are left untouched and the session returns to
    /// `Completed`, still usable.
    ///
    /// A failed revision is absorbed into the session first (an `Error:` log
    /// entry and [`last_error`](Self::last_error)) and only then returned.
    /// The returned error is informational: it lets a caller skip follow-up
    /// work such as exporting files, and needs no recovery.
    pub async fn request_revision(&self, instruction: &str) -> StudioResult<()> {
        let (proposal, files) = {
            let mut state = self.state.lock();
            match state.status {
                BuildStatus::Completed => {}
                status if status.is_busy() => {
                    debug!("Rejecting revision while {}", status);
                    return Err(StudioError::Busy(busy_label(status)));
                }
                status => {
                    return Err(StudioError::InvalidState {
                        current: status.to_string(),
                        expected: BuildStatus::Completed.to_string(),
                        operation: "request_revision".to_string(),
                    });
                }
            }
            let proposal = state.proposal.clone().ok_or_else(|| StudioError::InvalidState {
                current: "no proposal".to_string(),
                expected: "active proposal".to_string(),
                operation: "request_revision".to_string(),
            })?;
            state.status = BuildStatus::Revising;
            state.log.push(format!("Engine: Applying revision \"{}\"...", instruction));
            state.touch();
            (proposal, state.files.clone())
        };
        info!("Build {} revising {} files", self.id(), files.len());

        let result = self.gateway.revise_files(&proposal, &files, instruction).await;

        let mut state = self.state.lock();
        state.status = BuildStatus::Completed;
        state.touch();
        match result {
            Ok(mut revised) => {
                if let Some(preview) = revised.take(PREVIEW_FILE_NAME) {
                    state.preview_document = preview.content;
                }
                state
                    .log
                    .push(format!("Success: Revision applied. {} files in build.", revised.len()));
                state.files = revised;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Revision failed: {}", e);
                state.log.push(format!("Error: Revision failed. {}", e));
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Overwrite the content of file `index`. Purely local; the status is unchanged.
    ///
    /// Rejected with [`StudioError::Busy`] while a generation or revision is
    /// in flight, since its result replaces the whole file set.
    pub fn edit_file(&self, index: usize, content: impl Into<String>) -> StudioResult<()> {
        let mut state = self.state.lock();
        if state.status.is_busy() {
            debug!("Rejecting edit of file {} while {}", index, state.status);
            return Err(StudioError::Busy(busy_label(state.status)));
        }
        state.files.edit(index, content)?;
        state.touch();
        Ok(())
    }
}

fn busy_label(status: BuildStatus) -> String {
    match status {
        BuildStatus::Revising => "revision".to_string(),
        _ => "generation".to_string(),
    }
}
