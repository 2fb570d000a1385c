//! Live voice bridge.
//!
//! Streams captured microphone frames to a live endpoint and schedules the
//! returned audio for gapless playback. The platform audio graph and the
//! network channel are injected as capabilities ([`AudioCapture`],
//! [`PlaybackSink`], [`LiveConnector`]), so the bridge itself only owns the
//! state machine and the playback cursor.
//!
//! ```text
//! Closed ──open──▶ Connecting ──setup ok──▶ Open ──close / error──▶ Closed
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::StudioResult;
use crate::pcm::{self, OUTPUT_SAMPLE_RATE};
use crate::types::Proposal;

/// Connection state of a voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    #[default]
    Closed,
    Connecting,
    Open,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("Closed"),
            Self::Connecting => f.write_str("Connecting"),
            Self::Open => f.write_str("Open"),
        }
    }
}

/// A base64 PCM audio chunk as carried on the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub mime_type: String,
    pub data: String,
}

impl AudioChunk {
    /// Encode one captured frame as an outbound 16 kHz chunk.
    pub fn from_samples(samples: &[f32]) -> Self {
        Self {
            mime_type: pcm::input_mime_type(),
            data: pcm::encode_base64_pcm16(samples),
        }
    }

    /// Sample rate declared by the chunk, defaulting to the output rate.
    pub fn sample_rate(&self) -> u32 {
        pcm::rate_from_mime(&self.mime_type).unwrap_or(OUTPUT_SAMPLE_RATE)
    }

    pub fn samples(&self) -> StudioResult<Vec<f32>> {
        pcm::decode_base64_pcm16(&self.data)
    }
}

/// Inbound event from the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    Audio(AudioChunk),
    TurnComplete,
}

/// Microphone capture in fixed-size frames.
#[async_trait]
pub trait AudioCapture: Send {
    /// Next captured frame, or `None` once capture has ended.
    async fn next_frame(&mut self) -> Option<Vec<f32>>;

    fn stop(&mut self);
}

/// Output audio graph with its own clock.
pub trait PlaybackSink: Send {
    /// Current output-clock time, in seconds.
    fn current_time(&self) -> f64;

    /// Schedule `samples` to start at `start` seconds on the output clock.
    fn play_at(&mut self, samples: Vec<f32>, sample_rate: u32, start: f64);

    fn disconnect(&mut self);
}

/// An open bidirectional live channel.
#[async_trait]
pub trait LiveTransport: Send {
    async fn send_audio(&mut self, chunk: AudioChunk) -> StudioResult<()>;

    /// Next inbound event; `None` when the server has closed the channel.
    async fn next_event(&mut self) -> Option<StudioResult<LiveEvent>>;

    async fn close(&mut self) -> StudioResult<()>;
}

/// Opens live channels.
#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Connect and complete the session setup handshake.
    async fn connect(&self, system_instruction: &str) -> StudioResult<Box<dyn LiveTransport>>;
}

/// System instruction for a consultation about `proposal`.
pub fn consultant_instruction(proposal: &Proposal) -> String {
    format!(
        "You are the Lead Architect at Code-Set. You are discussing the project \"{}\" with the \
         lead engineer. Be technical, helpful, and innovative.",
        proposal.business_name
    )
}

/// One buffer handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBuffer {
    pub start: f64,
    pub duration: f64,
}

impl ScheduledBuffer {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Gapless playback cursor.
///
/// Each chunk starts at `max(next_start, now)` and advances the cursor by
/// its duration, so the cursor never moves backward and buffers never
/// overlap.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start: f64,
    scheduled: Vec<ScheduledBuffer>,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot of `duration` seconds and return its start time.
    pub fn schedule(&mut self, now: f64, duration: f64) -> f64 {
        self.scheduled.retain(|b| b.end() > now);
        let start = self.next_start.max(now);
        self.next_start = start + duration.max(0.0);
        self.scheduled.push(ScheduledBuffer { start, duration });
        start
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    /// Buffers scheduled and not yet known to have finished.
    pub fn scheduled(&self) -> &[ScheduledBuffer] {
        &self.scheduled
    }

    /// Forget all pending buffers; returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.scheduled.len();
        self.scheduled.clear();
        discarded
    }
}

/// How a voice session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    /// The caller asked to close
    ClosedByUser,
    /// Microphone capture ended
    CaptureEnded,
    /// The server closed the channel
    ClosedByServer,
    /// The channel failed; a fresh session is needed
    ReconnectRequired(String),
}

/// Observable voice state shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct VoiceStateHandle(Arc<Mutex<VoiceState>>);

impl VoiceStateHandle {
    pub fn get(&self) -> VoiceState {
        *self.0.lock()
    }

    fn set(&self, state: VoiceState) {
        let mut current = self.0.lock();
        if *current != state {
            debug!("Voice state {} -> {}", *current, state);
            *current = state;
        }
    }
}

/// Bidirectional audio adapter for one live consultation at a time.
pub struct LiveVoiceBridge {
    connector: Arc<dyn LiveConnector>,
    state: VoiceStateHandle,
    scheduler: PlaybackScheduler,
    frames_sent: usize,
}

impl LiveVoiceBridge {
    pub fn new(connector: Arc<dyn LiveConnector>) -> Self {
        Self {
            connector,
            state: VoiceStateHandle::default(),
            scheduler: PlaybackScheduler::new(),
            frames_sent: 0,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state.get()
    }

    /// Handle for observing the state while [`run`](Self::run) is in progress.
    pub fn state_handle(&self) -> VoiceStateHandle {
        self.state.clone()
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    /// Frames streamed during the last session.
    pub fn frames_sent(&self) -> usize {
        self.frames_sent
    }

    /// Run one consultation until the caller closes it, capture ends or the
    /// channel fails. The bridge is always `Closed` when this returns.
    pub async fn run(
        &mut self,
        system_instruction: &str,
        capture: &mut dyn AudioCapture,
        sink: &mut dyn PlaybackSink,
        mut shutdown: oneshot::Receiver<()>,
    ) -> VoiceOutcome {
        self.scheduler = PlaybackScheduler::new();
        self.frames_sent = 0;
        self.state.set(VoiceState::Connecting);
        info!("Opening live audio session");

        let mut transport = match self.connector.connect(system_instruction).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!("Live session failed to open: {}", e);
                self.state.set(VoiceState::Closed);
                return VoiceOutcome::ReconnectRequired(e.to_string());
            }
        };
        self.state.set(VoiceState::Open);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => break VoiceOutcome::ClosedByUser,
                frame = capture.next_frame() => match frame {
                    Some(samples) => {
                        if let Err(e) = transport.send_audio(AudioChunk::from_samples(&samples)).await {
                            break VoiceOutcome::ReconnectRequired(e.to_string());
                        }
                        self.frames_sent += 1;
                    }
                    None => break VoiceOutcome::CaptureEnded,
                },
                event = transport.next_event() => match event {
                    Some(Ok(LiveEvent::Audio(chunk))) => self.play(&chunk, sink),
                    Some(Ok(LiveEvent::TurnComplete)) => debug!("Model turn complete"),
                    Some(Err(e)) => break VoiceOutcome::ReconnectRequired(e.to_string()),
                    None => break VoiceOutcome::ClosedByServer,
                },
            }
        };

        capture.stop();
        sink.disconnect();
        let discarded = self.scheduler.clear();
        if let Err(e) = transport.close().await {
            debug!("Ignoring error while closing live channel: {}", e);
        }
        self.state.set(VoiceState::Closed);
        info!(
            "Live audio session closed ({:?}); {} frames sent, {} buffers discarded",
            outcome, self.frames_sent, discarded
        );
        outcome
    }

    fn play(&mut self, chunk: &AudioChunk, sink: &mut dyn PlaybackSink) {
        let samples = match chunk.samples() {
            Ok(samples) => samples,
            Err(e) => {
                warn!("Dropping undecodable audio chunk: {}", e);
                return;
            }
        };
        let rate = chunk.sample_rate();
        let duration = pcm::duration_secs(samples.len(), rate);
        let start = self.scheduler.schedule(sink.current_time(), duration);
        sink.play_at(samples, rate, start);
    }
}
