//! # codeset_studio
//!
//! Build sessions and generation plumbing for the Code-Set studio.
//!
//! A proposal is planned from a free-text brief, turned into a small set of
//! editable source files plus a standalone preview, and revised by
//! natural-language instruction. Brand assets, a narrated strategy summary,
//! a live voice consultation and a launch video hang off the same session.
//!
//! # Features
//!
//! - **Generation Gateway**: One round trip per capability, JSON-schema validated
//! - **Build Session**: Guarded state machine with lenient or strict failure handling
//! - **Live Voice Bridge**: 16 kHz PCM capture upstream, gapless 24 kHz playback downstream
//! - **Video Render Poller**: Submit, poll on a fixed interval, fetch once
//! - **Mock Gateway**: For testing without the generation service
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use codeset_studio::{BuildSession, GeminiGateway, GenerationGateway, StudioConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StudioConfig::load(None)?;
//!     let gateway = Arc::new(GeminiGateway::from_config(&config)?);
//!
//!     let proposal = gateway.propose_website("boutique coffee roaster in Lisbon").await?;
//!     let session = BuildSession::new(gateway).with_policy(config.failure_policy);
//!     let status = session.start(proposal).await?;
//!
//!     println!("{}: {} files", status, session.files().len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod gateway;
pub mod live;
pub mod mock;
pub mod pcm;
pub mod response;
pub mod session;
pub mod store;
pub mod types;
pub mod video;
pub mod voice;
pub mod workspace;

pub use config::{FailurePolicy, ModelConfig, StudioConfig};
pub use error::{ErrorKind, StudioError, StudioResult};
pub use files::{FileRecord, FileSet, GeneratedSite, PREVIEW_FILE_NAME};
pub use gateway::{GeminiGateway, GenerationGateway};
pub use live::{GeminiLiveConnector, GeminiLiveTransport};
pub use mock::{CapturedCall, MockGateway};
pub use session::{BuildSession, SessionSnapshot};
pub use store::{AccountRegistry, JsonFileStore, KeyValueStore, MemoryStore, ProjectStore, UserRecord};
pub use types::{ActivityLog, ActivityLogEntry, AudioClip, BuildStatus, ImageRef, PageOutline, Proposal};
pub use video::{GeminiVideoBackend, RenderJob, RenderedVideo, VideoBackend, VideoRenderPoller};
pub use voice::{
    AudioCapture, AudioChunk, LiveConnector, LiveEvent, LiveTransport, LiveVoiceBridge, PlaybackScheduler,
    PlaybackSink, VoiceOutcome, VoiceState,
};
pub use workspace::{EditorView, WorkspaceTab, WorkspaceView};
