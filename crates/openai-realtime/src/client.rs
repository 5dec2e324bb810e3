//! Drives one realtime speech response over a dedicated WebSocket connection.

use crate::{
    cancel::CancelSignal,
    error::RealtimeError,
    session::{GeneratedSpeech, SessionMachine, SessionState, Step},
    types::{ClientEvent, ResponseConfig, ServerEvent, SessionConfig},
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Error as WsError,
        client::IntoClientRequest,
        http::HeaderValue,
        protocol::Message as WsMessage,
    },
};
use tracing::{debug, error, info, warn};

pub const API_VERSION: &str = "2024-10-01-preview";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// An API key and the base URL it is valid for.
#[derive(Clone, Debug)]
pub struct Credentials {
    api_key: SecretString,
    api_base: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            api_key: SecretString::from(api_key.into()),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}

/// Everything the service needs to produce one spoken line.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Display name the model speaks as, e.g. `Dan`.
    pub speaker: String,
    pub voice: String,
    pub instructions: String,
    /// The conversation so far, one line per turn.
    pub transcript: String,
}

impl SpeechRequest {
    /// The full system prompt sent with `session.update`.
    pub fn session_instructions(&self) -> String {
        format!(
            "You are {speaker}. {instructions}. Always speak 1-2 sentences at a time. \
             Continue the conversation, continuing exactly where it left off, prefixed with '{speaker}: '.\n\
             {transcript}\n\n{speaker}: ",
            speaker = self.speaker,
            instructions = self.instructions,
            transcript = self.transcript,
        )
    }
}

/// Client for the realtime deployment. Holds no connection itself; every call
/// to [`RealtimeClient::run_once`] opens and closes its own socket.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    deployment: String,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl RealtimeClient {
    pub fn new(deployment: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Overrides the connect timeout and the maximum silence between inbound messages.
    pub fn with_timeouts(mut self, connect: Duration, idle: Duration) -> Self {
        self.connect_timeout = connect;
        self.idle_timeout = idle;
        self
    }

    /// Builds the WebSocket URL for `api_base`, switching `https`/`http` to `wss`/`ws`.
    pub fn endpoint_url(&self, api_base: &str) -> Result<String, RealtimeError> {
        let base = api_base.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else if base.starts_with("wss://") || base.starts_with("ws://") {
            base.to_string()
        } else {
            return Err(RealtimeError::InvalidEndpoint(base.to_string()));
        };
        Ok(format!(
            "{}/openai/realtime?api-version={}&deployment={}",
            ws_base, API_VERSION, self.deployment
        ))
    }

    /// Runs a single attempt: connect, wait for `session.created`, configure,
    /// request a response and collect it until `response.done`.
    ///
    /// The connection is closed before returning on every path. No retries
    /// happen here.
    pub async fn run_once(
        &self,
        credentials: &Credentials,
        request: &SpeechRequest,
        cancel: &CancelSignal,
    ) -> Result<GeneratedSpeech, RealtimeError> {
        if cancel.is_cancelled() {
            return Err(RealtimeError::Cancelled);
        }

        let url = self.endpoint_url(credentials.api_base())?;
        let mut ws_request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidEndpoint(e.to_string()))?;
        let api_key = HeaderValue::from_str(credentials.api_key().expose_secret())
            .map_err(|_| RealtimeError::InvalidEndpoint("api key is not a valid header".into()))?;
        ws_request.headers_mut().insert("api-key", api_key);
        ws_request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        info!(speaker = %request.speaker, voice = %request.voice, "Opening realtime session");
        let mut machine = SessionMachine::new();
        let (mut ws, _) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RealtimeError::Cancelled),
            connected = tokio::time::timeout(self.connect_timeout, connect_async(ws_request)) => {
                connected.map_err(|_| RealtimeError::Timeout("connection"))??
            }
        };
        debug!(%url, "WebSocket connection established");
        machine.connected();

        let outcome = self.drive(&mut ws, &mut machine, request, cancel).await;

        if let Err(e) = ws.close(None).await {
            debug!(error = %e, "WebSocket close did not complete cleanly");
        }
        debug!("WebSocket connection closed.");

        outcome?;
        let speech = machine.finish()?;
        info!(
            speaker = %request.speaker,
            transcript_chars = speech.transcript.len(),
            "Realtime response complete"
        );
        Ok(speech)
    }

    async fn drive<S>(
        &self,
        ws: &mut S,
        machine: &mut SessionMachine,
        request: &SpeechRequest,
        cancel: &CancelSignal,
    ) -> Result<(), RealtimeError>
    where
        S: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Unpin,
    {
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    if machine.response_in_flight() {
                        // Tell the service to stop generating before the socket goes away.
                        if let Err(e) = send_event(ws, &ClientEvent::ResponseCancel).await {
                            debug!(error = %e, "Failed to send response.cancel");
                        }
                    }
                    warn!(state = ?machine.state(), "Realtime session cancelled");
                    return machine.fail(RealtimeError::Cancelled);
                }
                next = tokio::time::timeout(self.idle_timeout, ws.next()) => match next {
                    Err(_) => {
                        let waiting_for = match machine.state() {
                            SessionState::AwaitingSessionCreated => "session.created",
                            _ => "response.done",
                        };
                        return machine.fail(RealtimeError::Timeout(waiting_for));
                    }
                    Ok(None) => return machine.fail(RealtimeError::Closed),
                    Ok(Some(Err(e))) => {
                        error!(error = %e, "WebSocket error");
                        return machine.fail(e.into());
                    }
                    Ok(Some(Ok(message))) => message,
                },
            };

            let text = match message {
                WsMessage::Text(text) => text,
                WsMessage::Close(frame) => {
                    debug!(?frame, "Server closed the connection");
                    return machine.fail(RealtimeError::Closed);
                }
                _ => continue,
            };

            let event = match ServerEvent::parse(&text) {
                Ok(event) => event,
                Err(e) => return machine.fail(e.into()),
            };
            debug!(event = event.name(), "Received WebSocket message");

            match machine.on_event(event)? {
                Step::Continue => {}
                Step::Configure => {
                    let session = ClientEvent::SessionUpdate {
                        session: SessionConfig::new(request.session_instructions(), &request.voice),
                    };
                    if let Err(e) = send_event(ws, &session).await {
                        return machine.fail(e);
                    }
                    debug!("Sent session.update with instructions.");

                    let response = ClientEvent::ResponseCreate {
                        response: ResponseConfig::new(&request.voice),
                    };
                    if let Err(e) = send_event(ws, &response).await {
                        return machine.fail(e);
                    }
                    debug!("Sent response.create message.");
                    machine.configured()?;
                }
                Step::Done => {
                    debug!(audio_bytes = machine.audio_len(), "Received response.done");
                    return Ok(());
                }
            }
        }
    }
}

async fn send_event<S>(ws: &mut S, event: &ClientEvent) -> Result<(), RealtimeError>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let json = event.to_json()?;
    ws.send(WsMessage::Text(json.into())).await?;
    Ok(())
}
