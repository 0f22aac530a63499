//! Newline-delimited JSON bridge between the interview engine and the voice
//! platform sidecar.
//!
//! The sidecar owns the real-time audio session. It forwards platform events
//! on our stdin and executes whatever we print on stdout: session
//! configuration, the opening reply, scripted lines and tool results.

use anyhow::{Context, Result};
use interview_core::case::{AckStatus, CaseArgs, ToolAck};
use interview_core::publisher::RoomService;
use interview_core::schedule::PromptSchedule;
use interview_core::session::{InterviewSession, SessionEvent, SessionSummary, UserState};
use interview_core::tool::{SET_CASE_METADATA, Tool, set_case_metadata_tool};
use interview_core::Command;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Messages the sidecar sends us.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformMessage {
    SessionStarted,
    ToolCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: Value,
    },
    UserStateChanged {
        old_state: UserState,
        new_state: UserState,
    },
    Transcript {
        text: String,
        is_final: bool,
    },
    SessionEnded,
}

/// Messages we ask the sidecar to execute.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    SessionConfig {
        instructions: String,
        tools: Vec<Tool>,
    },
    GenerateReply,
    Speak {
        text: String,
    },
    ToolResult {
        call_id: String,
        output: ToolAck,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("malformed platform message: {0}")]
    MalformedLine(#[from] serde_json::Error),
}

pub fn parse_line(line: &str) -> Result<PlatformMessage, BridgeError> {
    Ok(serde_json::from_str(line)?)
}

/// Everything needed to run one interview over the bridge.
pub struct SessionSetup {
    pub room: String,
    pub instructions: String,
    pub room_service: Arc<dyn RoomService>,
    pub schedule: PromptSchedule,
}

/// Drives one interview session from `input` to `output`.
///
/// Returns `None` when the input closes, or `stop` fires, before the platform
/// signals the start of the session. Once the session runs, `stop` ends it
/// through the same teardown as `session_ended`.
pub async fn run_session<R, W>(
    input: R,
    output: W,
    setup: SessionSetup,
    stop: CancellationToken,
) -> Result<Option<SessionSummary>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut out = LineWriter { inner: output };

    // Nothing runs until the platform hands us a live session.
    loop {
        let line = tokio::select! {
            () = stop.cancelled() => {
                tracing::info!("Stopped before the session started");
                return Ok(None);
            }
            line = lines.next_line() => line.context("Failed to read platform input")?,
        };
        let Some(line) = line else {
            tracing::info!("Platform input closed before the session started");
            return Ok(None);
        };
        match parse_line(&line) {
            Ok(PlatformMessage::SessionStarted) => break,
            Ok(other) => tracing::warn!("Ignoring message before session start: {:?}", other),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    out.send(&AgentMessage::SessionConfig {
        instructions: setup.instructions,
        tools: vec![set_case_metadata_tool()],
    })
    .await?;
    out.send(&AgentMessage::GenerateReply).await?;

    let (command_tx, mut command_rx) = tokio::sync::mpsc::channel::<Command>(32);
    let mut session = InterviewSession::start(
        setup.room,
        setup.room_service,
        command_tx,
        setup.schedule,
    );

    loop {
        tokio::select! {
            () = stop.cancelled() => {
                tracing::info!("Stop requested, ending session");
                break;
            }
            Some(command) = command_rx.recv() => {
                out.send(&speak(command)).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read platform input")? else {
                    tracing::info!("Platform input closed");
                    break;
                };
                let message = match parse_line(&line) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        continue;
                    }
                };
                if message == PlatformMessage::SessionEnded {
                    break;
                }
                let routed = route(message);
                if let Some(reply) = routed.reply {
                    out.send(&reply).await?;
                }
                if let Some(event) = routed.event {
                    session.handle_event(event);
                }
            }
        }
    }

    let summary = session.shutdown().await;
    // Prompts that were already handed to the sink still go out.
    while let Ok(command) = command_rx.try_recv() {
        out.send(&speak(command)).await?;
    }
    Ok(Some(summary))
}

fn speak(command: Command) -> AgentMessage {
    match command {
        Command::SpeakText(text) => AgentMessage::Speak { text },
    }
}

#[derive(Debug, Default)]
struct Routed {
    event: Option<SessionEvent>,
    reply: Option<AgentMessage>,
}

/// Translates a platform message into an engine event and an optional reply.
fn route(message: PlatformMessage) -> Routed {
    match message {
        PlatformMessage::ToolCall {
            call_id,
            name,
            arguments,
        } => route_tool_call(call_id, &name, &arguments),
        PlatformMessage::UserStateChanged {
            old_state,
            new_state,
        } => Routed {
            event: Some(SessionEvent::UserStateChanged {
                old: old_state,
                new: new_state,
            }),
            reply: None,
        },
        PlatformMessage::Transcript { text, is_final } => Routed {
            event: Some(SessionEvent::Transcript { text, is_final }),
            reply: None,
        },
        PlatformMessage::SessionStarted | PlatformMessage::SessionEnded => {
            tracing::debug!("Ignoring repeated session lifecycle message");
            Routed::default()
        }
    }
}

fn route_tool_call(call_id: String, name: &str, arguments: &Value) -> Routed {
    if name != SET_CASE_METADATA {
        tracing::warn!(%name, "LLM called an unknown tool");
        return Routed {
            event: None,
            reply: Some(AgentMessage::ToolResult {
                call_id,
                output: ToolAck {
                    status: AckStatus::Error,
                    message: format!("Unknown tool: {name}"),
                },
            }),
        };
    }

    let args = match parse_case_args(arguments) {
        Ok(args) => args,
        Err(e) => {
            tracing::warn!("Invalid {} arguments: {}", SET_CASE_METADATA, e);
            return Routed {
                event: None,
                reply: Some(AgentMessage::ToolResult {
                    call_id,
                    output: ToolAck {
                        status: AckStatus::Error,
                        message: format!("Invalid arguments: {e}"),
                    },
                }),
            };
        }
    };

    Routed {
        reply: Some(AgentMessage::ToolResult {
            call_id,
            output: ToolAck::for_args(&args),
        }),
        event: Some(SessionEvent::ToolExecuted(args)),
    }
}

/// Tool arguments arrive either as an object or as the raw JSON string the LLM produced.
fn parse_case_args(arguments: &Value) -> Result<CaseArgs, serde_json::Error> {
    match arguments {
        Value::String(raw) => serde_json::from_str(raw),
        Value::Null => Ok(CaseArgs::default()),
        other => serde_json::from_value(other.clone()),
    }
}

struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    async fn send(&mut self, message: &AgentMessage) -> Result<()> {
        let mut line = serde_json::to_vec(message).context("Failed to serialize agent message")?;
        line.push(b'\n');
        self.inner
            .write_all(&line)
            .await
            .context("Failed to write to platform output")?;
        self.inner
            .flush()
            .await
            .context("Failed to flush platform output")
    }
}
