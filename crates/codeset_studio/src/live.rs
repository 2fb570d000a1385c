//! Gemini Live websocket transport for the voice bridge.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};
use crate::voice::{AudioChunk, LiveConnector, LiveEvent, LiveTransport};

const SETUP_TIMEOUT: Duration = Duration::from_secs(30);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens Gemini Live sessions that answer with native audio.
pub struct GeminiLiveConnector {
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiLiveConnector {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &StudioConfig) -> StudioResult<Self> {
        let key = config.require_api_key()?;
        Ok(Self::new(
            config.live_endpoint.clone(),
            key,
            config.models.live.clone(),
        ))
    }
}

/// The first message of every session.
pub fn setup_message(model: &str, system_instruction: &str) -> Value {
    let model = if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    };
    json!({
        "setup": {
            "model": model,
            "generationConfig": { "responseModalities": ["AUDIO"] },
            "systemInstruction": { "parts": [{ "text": system_instruction }] }
        }
    })
}

/// Outbound realtime audio message for one captured frame.
pub fn audio_message(chunk: &AudioChunk) -> Value {
    json!({
        "realtimeInput": {
            "mediaChunks": [{ "mimeType": chunk.mime_type, "data": chunk.data }]
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    #[serde(default)]
    setup_complete: Option<Value>,
    #[serde(default)]
    server_content: Option<ServerContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    #[serde(default)]
    model_turn: Option<ModelTurn>,
    #[serde(default)]
    turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<TurnPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnPart {
    #[serde(default)]
    inline_data: Option<crate::gateway::InlineData>,
}

/// Parsed server frame: whether it completes setup, and the events it carries.
pub(crate) fn parse_server_frame(text: &str) -> StudioResult<(bool, Vec<LiveEvent>)> {
    let message: ServerMessage = serde_json::from_str(text)
        .map_err(|e| StudioError::malformed(format!("live frame is not valid JSON: {}", e)))?;

    let mut events = Vec::new();
    if let Some(content) = message.server_content {
        let parts = content.model_turn.map(|t| t.parts).unwrap_or_default();
        for part in parts {
            if let Some(inline) = part.inline_data {
                events.push(LiveEvent::Audio(AudioChunk {
                    mime_type: inline.mime_type,
                    data: inline.data,
                }));
            }
        }
        if content.turn_complete {
            events.push(LiveEvent::TurnComplete);
        }
    }
    Ok((message.setup_complete.is_some(), events))
}

fn frame_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text),
        Message::Binary(bytes) => String::from_utf8(bytes).ok(),
        _ => None,
    }
}

#[async_trait]
impl LiveConnector for GeminiLiveConnector {
    async fn connect(&self, system_instruction: &str) -> StudioResult<Box<dyn LiveTransport>> {
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        debug!("Connecting live channel to {}", self.endpoint);
        let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;

        let setup = setup_message(&self.model, system_instruction);
        socket.send(Message::Text(setup.to_string())).await?;

        let mut pending = VecDeque::new();
        tokio::time::timeout(SETUP_TIMEOUT, async {
            loop {
                match socket.next().await {
                    None | Some(Ok(Message::Close(_))) => {
                        return Err(StudioError::Upstream(
                            "live channel closed during setup".to_string(),
                        ));
                    }
                    Some(Ok(message)) => {
                        if let Some(text) = frame_text(message) {
                            let (complete, events) = parse_server_frame(&text)?;
                            pending.extend(events);
                            if complete {
                                return Ok(());
                            }
                        }
                    }
                    Some(Err(e)) => return Err(StudioError::from(e)),
                }
            }
        })
        .await
        .map_err(|_| StudioError::Upstream("live setup timed out".to_string()))??;

        info!("Live session open on {}", self.model);
        Ok(Box::new(GeminiLiveTransport { socket, pending }))
    }
}

/// An open Gemini Live session.
pub struct GeminiLiveTransport {
    socket: Socket,
    pending: VecDeque<LiveEvent>,
}

#[async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn send_audio(&mut self, chunk: AudioChunk) -> StudioResult<()> {
        self.socket
            .send(Message::Text(audio_message(&chunk).to_string()))
            .await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<StudioResult<LiveEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            let message = match self.socket.next().await? {
                Ok(Message::Close(_)) => return None,
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };
            let Some(text) = frame_text(message) else {
                continue;
            };
            match parse_server_frame(&text) {
                Ok((_, events)) => self.pending.extend(events),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn close(&mut self) -> StudioResult<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}
