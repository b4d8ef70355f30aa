//! Run transport abstraction
//!
//! One streaming interface, two backends: the managed API streams
//! newline-delimited JSON frames over an HTTP response body, a local VM
//! speaks the same frames over a raw WebSocket to its tool server. The
//! execution streamer consumes [`RunTransport`] and never branches on
//! which backend is underneath.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::{API_KEY_HEADER, TeleflowClient};
use teleflow_core::RunMessage;
use teleflow_core::domain::{Computer, ComputerConfig, ComputerOrigin, ScreenConfig, Workflow};

/// Undecoded message stream as produced by a transport
///
/// Items are `Err` only for channel-level failures; protocol-level problems
/// (unknown frames, malformed JSON) are already folded into non-fatal
/// [`RunMessage::Error`] items.
pub type RawRunStream = Pin<Box<dyn Stream<Item = Result<RunMessage>> + Send>>;

/// A backend capable of executing one workflow run as a message stream
///
/// Each call to `open_run_stream` opens a fresh channel and a fresh run;
/// streams are not restartable. Dropping the returned stream closes the
/// channel, which is the best-effort abort signal to the backend.
#[async_trait]
pub trait RunTransport: Send + Sync {
    async fn open_run_stream(
        &self,
        computer: &Computer,
        workflow: &Workflow,
        user_inputs: &HashMap<String, serde_json::Value>,
    ) -> Result<RawRunStream>;
}

impl TeleflowClient {
    /// Selects the transport for a computer by its origin flag
    pub(crate) fn transport_for(&self, computer: &Computer) -> Box<dyn RunTransport> {
        match computer.origin {
            ComputerOrigin::Remote => Box::new(RemoteRunTransport {
                http: self.http().clone(),
                base_url: self.base_url().to_string(),
                api_key: self.api_key().to_string(),
            }),
            ComputerOrigin::Local => Box::new(LocalRunTransport::default()),
        }
    }
}

// =============================================================================
// Remote transport (HTTP + NDJSON)
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    remote_computer: &'a Computer,
    workflow: &'a Workflow,
    user_inputs: &'a HashMap<String, serde_json::Value>,
}

/// Streams runs from the managed backend's `/runs` endpoint
///
/// The response body is one JSON frame per line; the connection has no
/// read timeout since workflows can run for a long time between frames.
pub struct RemoteRunTransport {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

#[async_trait]
impl RunTransport for RemoteRunTransport {
    async fn open_run_stream(
        &self,
        computer: &Computer,
        workflow: &Workflow,
        user_inputs: &HashMap<String, serde_json::Value>,
    ) -> Result<RawRunStream> {
        let url = format!("{}/runs", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&CreateRunRequest {
                remote_computer: computer,
                workflow,
                user_inputs,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), message));
        }

        debug!(%url, "run stream opened");
        let mut body = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(ClientError::Transport(e));
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);
                for line in drain_complete_lines(&mut buffer) {
                    yield Ok(RunMessage::decode(&line));
                }
            }

            // Flush whatever is left once the body ends without a newline.
            let rest = String::from_utf8_lossy(&buffer);
            for line in rest.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    yield Ok(RunMessage::decode(line));
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Drains complete newline-terminated lines out of a byte buffer
///
/// Splits on raw bytes: a multi-byte UTF-8 character straddling two body
/// chunks stays in the buffer until its line completes, then decodes
/// intact. Blank lines are dropped.
fn drain_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=newline_pos).collect();
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    lines
}

// =============================================================================
// Local transport (raw WebSocket to the tool server)
// =============================================================================

type WsSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Protocol version stamped on outbound frames
const FRAME_VERSION: &str = "1.0";

/// Default handshake timeout for local connections
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ConfigureFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: &'static str,
    content: &'a ComputerConfig,
}

#[derive(Debug, Serialize)]
struct WorkflowContent<'a> {
    workflow: &'a Workflow,
    user_inputs: &'a HashMap<String, serde_json::Value>,
    os_name: teleflow_core::domain::OsName,
    screen: ScreenConfig,
}

#[derive(Debug, Serialize)]
struct StartWorkflowFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: &'static str,
    content: WorkflowContent<'a>,
}

/// Streams runs over a direct WebSocket to a local VM's tool server
pub struct LocalRunTransport {
    pub handshake_timeout: Duration,
}

impl Default for LocalRunTransport {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

#[async_trait]
impl RunTransport for LocalRunTransport {
    async fn open_run_stream(
        &self,
        computer: &Computer,
        workflow: &Workflow,
        user_inputs: &HashMap<String, serde_json::Value>,
    ) -> Result<RawRunStream> {
        let ws_url = ws_endpoint(&computer.tool_server_url);
        let mut socket =
            connect_and_configure(&ws_url, &computer.config, self.handshake_timeout).await?;

        let start = StartWorkflowFrame {
            kind: "start_workflow",
            version: FRAME_VERSION,
            content: WorkflowContent {
                workflow,
                user_inputs,
                os_name: computer.config.os_name,
                screen: computer.config.screen,
            },
        };
        send_frame(&mut socket, &start).await?;
        debug!(%ws_url, "local run stream opened");

        let stream = async_stream::stream! {
            // The tool server does not echo a start acknowledgement; the
            // accepted start frame is the start of the run.
            yield Ok(RunMessage::RunStarted { run_id: None });

            while let Some(message) = socket.next().await {
                match message {
                    Ok(WsMessage::Text(payload)) => {
                        if let Some(decoded) = decode_ws_frame(payload.as_bytes()) {
                            let terminal = decoded.is_terminal();
                            yield Ok(decoded);
                            if terminal {
                                let _ = socket.close(None).await;
                                return;
                            }
                        }
                    }
                    Ok(WsMessage::Binary(payload)) => {
                        if let Some(decoded) = decode_ws_frame(&payload) {
                            let terminal = decoded.is_terminal();
                            yield Ok(decoded);
                            if terminal {
                                let _ = socket.close(None).await;
                                return;
                            }
                        }
                    }
                    Ok(WsMessage::Ping(payload)) => {
                        if let Err(e) = socket.send(WsMessage::Pong(payload)).await {
                            yield Err(ClientError::WebSocket(e.to_string()));
                            return;
                        }
                    }
                    Ok(WsMessage::Pong(_)) => {}
                    Ok(WsMessage::Close(_)) => return,
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(ClientError::WebSocket(e.to_string()));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Derives the run-streaming WebSocket endpoint from a tool server URL
pub(crate) fn ws_endpoint(tool_server_url: &str) -> String {
    let base = tool_server_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{base}")
    };
    format!("{base}/ws/workflow")
}

/// Opens a WebSocket to the tool server and completes the configure
/// handshake within `timeout`
///
/// Used both for run streams and for the local connector's liveness probe.
pub(crate) async fn connect_and_configure(
    ws_url: &str,
    config: &ComputerConfig,
    timeout: Duration,
) -> Result<WsSocket> {
    let handshake = async {
        let (mut socket, _) = connect_async(ws_url)
            .await
            .map_err(|e| ClientError::Connection(format!("{ws_url}: {e}")))?;

        let configure = ConfigureFrame {
            kind: "configure",
            version: FRAME_VERSION,
            content: config,
        };
        send_frame(&mut socket, &configure).await?;
        await_configure_ack(&mut socket, ws_url).await?;
        Ok(socket)
    };

    tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| {
            ClientError::Connection(format!(
                "handshake with {ws_url} did not complete within {timeout:?}"
            ))
        })?
}

async fn send_frame<F: Serialize>(socket: &mut WsSocket, frame: &F) -> Result<()> {
    let payload =
        serde_json::to_string(frame).map_err(|e| ClientError::Parse(e.to_string()))?;
    socket
        .send(WsMessage::Text(payload.into()))
        .await
        .map_err(|e| ClientError::WebSocket(e.to_string()))
}

async fn await_configure_ack(socket: &mut WsSocket, ws_url: &str) -> Result<()> {
    while let Some(message) = socket.next().await {
        match message {
            Ok(WsMessage::Text(payload)) => {
                let value: serde_json::Value = serde_json::from_str(payload.as_ref())
                    .map_err(|e| ClientError::Connection(format!("bad handshake frame: {e}")))?;
                return match value.get("type").and_then(|t| t.as_str()) {
                    Some("configure_ack") => Ok(()),
                    other => Err(ClientError::Connection(format!(
                        "expected configure_ack from {ws_url}, got {other:?}"
                    ))),
                };
            }
            Ok(WsMessage::Ping(payload)) => {
                socket
                    .send(WsMessage::Pong(payload))
                    .await
                    .map_err(|e| ClientError::WebSocket(e.to_string()))?;
            }
            Ok(WsMessage::Close(_)) => {
                return Err(ClientError::Connection(format!(
                    "{ws_url} closed during handshake"
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(ClientError::WebSocket(e.to_string())),
        }
    }
    Err(ClientError::Connection(format!(
        "{ws_url} closed during handshake"
    )))
}

/// Decodes one tool-server frame into the run message taxonomy
///
/// Returns None for frames that are not run progress (handshake echoes).
/// The tool server's terminal frame names differ slightly from the
/// managed backend's; both map onto the same [`RunMessage`] variants.
fn decode_ws_frame(payload: &[u8]) -> Option<RunMessage> {
    let value: serde_json::Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(e) => {
            return Some(RunMessage::Error {
                error: format!("failed to decode message: {e}"),
                fatal: false,
            });
        }
    };

    let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or("");
    match kind {
        "assistant" => Some(RunMessage::Assistant {
            content: value.get("content").cloned().unwrap_or(serde_json::Value::Null),
        }),
        "sequence_status" | "workflow_sequence_status" => {
            let sequence_id = value.get("sequence_id").and_then(|v| v.as_str());
            let success = value.get("success").and_then(|v| v.as_bool());
            match (sequence_id, success) {
                (Some(sequence_id), Some(success)) => Some(RunMessage::SequenceStatus {
                    sequence_id: sequence_id.to_string(),
                    success,
                    error: value
                        .get("error")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                }),
                _ => Some(RunMessage::Error {
                    error: format!("malformed sequence_status frame: {value}"),
                    fatal: false,
                }),
            }
        }
        "workflow_completed" => Some(RunMessage::completed()),
        "error" => {
            let error = value
                .get("content")
                .or_else(|| value.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error")
                .to_string();
            Some(RunMessage::Error { error, fatal: true })
        }
        "configure_ack" => None,
        other => {
            warn!(kind = other, "unrecognized tool server frame");
            Some(RunMessage::Error {
                error: format!("unrecognized message type: {other}"),
                fatal: false,
            })
        }
    }
}
