//! Socket Mode transport and event pump.
//!
//! Envelopes are acknowledged before dispatch. A chat modal submission is the
//! one place the ack itself carries a payload: Slack only swaps the modal to
//! the thinking view if the ack contains a `response_action: update`.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::{
    api::SlackApiClient,
    blocks::{chat_loading_view, CHAT_INPUT_ACTION_ID, CHAT_INPUT_BLOCK_ID, CHAT_MODAL_CALLBACK_ID},
    commands::SlashCommandPayload,
    events::{
        AppMentionEvent, BlockActionEvent, DispatchError, EventContext, EventDispatcher,
        SlackEnvelope, SlackEvent, ViewSubmissionEvent,
    },
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(
        &self,
        envelope_id: &str,
        payload: Option<Value>,
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// A single frame read off the Socket Mode websocket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Hello,
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
}

/// Maps a raw Socket Mode frame to the internal event model. Envelope kinds
/// we do not handle still come back as `Unsupported` so the pump can ack them.
pub fn parse_frame(frame: &Value) -> Option<Frame> {
    let frame_type = frame.get("type").and_then(Value::as_str)?;
    match frame_type {
        "hello" => Some(Frame::Hello),
        "disconnect" => {
            let reason =
                frame.get("reason").and_then(Value::as_str).unwrap_or("unspecified").to_owned();
            Some(Frame::Disconnect { reason })
        }
        _ => {
            let envelope_id = frame.get("envelope_id").and_then(Value::as_str)?.to_owned();
            let payload = frame.get("payload").unwrap_or(&Value::Null);
            let event = match frame_type {
                "slash_commands" => parse_slash_command(payload),
                "interactive" => parse_interactive(payload),
                "events_api" => parse_events_api(payload),
                other => SlackEvent::Unsupported { event_type: other.to_owned() },
            };
            Some(Frame::Envelope(SlackEnvelope { envelope_id, event }))
        }
    }
}

fn text_field(value: &Value, field: &str) -> String {
    value.get(field).and_then(Value::as_str).unwrap_or_default().to_owned()
}

fn parse_slash_command(payload: &Value) -> SlackEvent {
    SlackEvent::SlashCommand(SlashCommandPayload {
        command: text_field(payload, "command"),
        text: text_field(payload, "text"),
        user_id: text_field(payload, "user_id"),
        channel_id: text_field(payload, "channel_id"),
        trigger_id: text_field(payload, "trigger_id"),
    })
}

fn parse_interactive(payload: &Value) -> SlackEvent {
    let user_id = payload
        .get("user")
        .and_then(|user| user.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    match payload.get("type").and_then(Value::as_str) {
        Some("block_actions") => {
            let action = payload.get("actions").and_then(|actions| actions.get(0));
            SlackEvent::BlockAction(BlockActionEvent {
                user_id,
                view_id: payload
                    .get("view")
                    .and_then(|view| view.get("id"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                action_id: action
                    .map(|action| text_field(action, "action_id"))
                    .unwrap_or_default(),
                value: action
                    .and_then(|action| action.get("value"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            })
        }
        Some("view_submission") => {
            let view = payload.get("view").unwrap_or(&Value::Null);
            let submitted_text = view
                .get("state")
                .and_then(|state| state.get("values"))
                .and_then(|values| values.get(CHAT_INPUT_BLOCK_ID))
                .and_then(|block| block.get(CHAT_INPUT_ACTION_ID))
                .and_then(|input| input.get("value"))
                .and_then(Value::as_str)
                .map(str::to_owned);

            SlackEvent::ViewSubmission(ViewSubmissionEvent {
                user_id,
                view_id: text_field(view, "id"),
                callback_id: text_field(view, "callback_id"),
                submitted_text,
            })
        }
        other => SlackEvent::Unsupported {
            event_type: format!("interactive:{}", other.unwrap_or("unknown")),
        },
    }
}

fn parse_events_api(payload: &Value) -> SlackEvent {
    let event = payload.get("event").unwrap_or(&Value::Null);
    match event.get("type").and_then(Value::as_str) {
        Some("app_mention") => SlackEvent::AppMention(AppMentionEvent {
            channel_id: text_field(event, "channel"),
            user_id: text_field(event, "user"),
            text: text_field(event, "text"),
            ts: text_field(event, "ts"),
            thread_ts: event.get("thread_ts").and_then(Value::as_str).map(str::to_owned),
        }),
        other => SlackEvent::Unsupported {
            event_type: format!("events_api:{}", other.unwrap_or("unknown")),
        },
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production transport. Each `connect` asks the Web API for a fresh
/// websocket URL, so reconnects always land on a live endpoint.
pub struct WebSocketTransport {
    api: Arc<SlackApiClient>,
    stream: tokio::sync::Mutex<Option<WsStream>>,
}

impl WebSocketTransport {
    pub fn new(api: Arc<SlackApiClient>) -> Self {
        Self { api, stream: tokio::sync::Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .api
            .connections_open()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Receive("transport is not connected".to_owned()));
        };

        loop {
            let Some(message) = stream.next().await else {
                return Ok(None);
            };
            let message = message.map_err(|error| TransportError::Receive(error.to_string()))?;

            match message {
                Message::Text(text) => {
                    let frame: Value = serde_json::from_str(&text)
                        .map_err(|error| TransportError::Receive(error.to_string()))?;
                    match parse_frame(&frame) {
                        Some(Frame::Hello) => {
                            debug!("socket mode hello received");
                        }
                        Some(Frame::Disconnect { reason }) => {
                            // Surfacing this as a read error routes it through
                            // the reconnect path, which fetches a new URL.
                            return Err(TransportError::Receive(format!(
                                "server requested disconnect: {reason}"
                            )));
                        }
                        Some(Frame::Envelope(envelope)) => return Ok(Some(envelope)),
                        None => {
                            debug!("skipping unrecognized socket mode frame");
                        }
                    }
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn acknowledge(
        &self,
        envelope_id: &str,
        payload: Option<Value>,
    ) -> Result<(), TransportError> {
        let mut ack = json!({ "envelope_id": envelope_id });
        if let Some(payload) = payload {
            ack["payload"] = payload;
        }

        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Acknowledge("transport is not connected".to_owned()));
        };
        stream
            .send(Message::Text(ack.to_string().into()))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            stream
                .close(None)
                .await
                .map_err(|error| TransportError::Disconnect(error.to_string()))?;
        }
        Ok(())
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; shutting down the event pump"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            info!(
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                "received slack envelope"
            );

            let ack_payload = ack_payload(&envelope);
            if let Err(error) =
                self.transport.acknowledge(&envelope.envelope_id, ack_payload).await
            {
                warn!(
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(envelope_id = %envelope.envelope_id, "acknowledged slack envelope");
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            if let Err(error) = self.dispatcher.dispatch(&envelope, &context).await {
                warn!(
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "event dispatch failed; continuing socket loop"
                );
            }
        }
    }
}

/// Chat modal submissions ack with the thinking view so the user sees
/// progress while the relay runs. Everything else acks bare.
fn ack_payload(envelope: &SlackEnvelope) -> Option<Value> {
    match &envelope.event {
        SlackEvent::ViewSubmission(event) if event.callback_id == CHAT_MODAL_CALLBACK_ID => {
            Some(json!({ "response_action": "update", "view": chat_loading_view() }))
        }
        _ => None,
    }
}
