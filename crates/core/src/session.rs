use crate::CommandTx;
use crate::case::{CaseArgs, CaseMetadata};
use crate::clock::InterviewClock;
use crate::phase::{InterviewPhase, PhaseHandle};
use crate::publisher::{MetadataPublisher, PublishOutcome, RoomService};
use crate::schedule::PromptSchedule;
use crate::silence::SilenceTimer;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Speaking state of the candidate as reported by the voice platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    Speaking,
    Listening,
    Away,
}

/// Platform events the interview engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The LLM finished a `set_case_metadata` call.
    ToolExecuted(CaseArgs),
    UserStateChanged { old: UserState, new: UserState },
    Transcript { text: String, is_final: bool },
}

/// Reported once the session is torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub final_phase: InterviewPhase,
    pub case: CaseMetadata,
    pub publishes: usize,
    pub clock_prompts: usize,
}

/// Per-session event router.
///
/// Owns every piece of mutable interview state for exactly one session: the
/// phase, the case metadata, the silence timer and the interview clock. Event
/// handling never waits on the voice session or the room service; those run
/// as tracked tasks.
pub struct InterviewSession {
    phase: PhaseHandle,
    publisher: Arc<MetadataPublisher>,
    silence: SilenceTimer,
    clock: InterviewClock,
    publishes: JoinSet<PublishOutcome>,
    cancel: CancellationToken,
}

impl InterviewSession {
    /// Starts a session. The clock origin is captured here.
    pub fn start(
        room: impl Into<String>,
        room_service: Arc<dyn RoomService>,
        command_tx: CommandTx,
        schedule: PromptSchedule,
    ) -> Self {
        let room = room.into();
        let origin = Instant::now();
        let cancel = CancellationToken::new();
        let phase = PhaseHandle::new();

        tracing::info!(%room, "Interview session started");
        let publisher = Arc::new(MetadataPublisher::new(room, room_service, phase.clone()));
        let silence = SilenceTimer::new(
            phase.clone(),
            command_tx.clone(),
            &schedule,
            cancel.child_token(),
        );
        let clock = InterviewClock::start(
            origin,
            schedule.clock_stages,
            command_tx,
            cancel.child_token(),
        );

        Self {
            phase,
            publisher,
            silence,
            clock,
            publishes: JoinSet::new(),
            cancel,
        }
    }

    pub fn phase(&self) -> InterviewPhase {
        self.phase.current()
    }

    pub fn silence_pending(&self) -> bool {
        self.silence.is_pending()
    }

    /// Dispatches one platform event. Never blocks on I/O.
    pub fn handle_event(&mut self, event: SessionEvent) {
        self.reap_publishes();

        match event {
            SessionEvent::ToolExecuted(args) => {
                let publisher = Arc::clone(&self.publisher);
                let seq = publisher.begin_invocation();
                self.publishes
                    .spawn(async move { publisher.on_tool_invoked(seq, args).await });
            }
            SessionEvent::UserStateChanged { old, new } => match (old, new) {
                (UserState::Speaking, UserState::Listening) => {
                    self.silence.on_user_stopped_speaking()
                }
                (_, UserState::Speaking) => self.silence.on_user_started_speaking(),
                (old, new) => {
                    tracing::debug!(?old, ?new, "Ignoring user state transition");
                }
            },
            SessionEvent::Transcript { text, is_final } => {
                if !is_final {
                    return;
                }
                tracing::info!("User said: \"{}\"", text);
                self.phase.advance_on_transcript(&text);
            }
        }
    }

    /// Consumes events until the stream closes, then tears the session down.
    pub async fn run(
        mut self,
        mut events: tokio::sync::mpsc::Receiver<SessionEvent>,
    ) -> SessionSummary {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        tracing::info!("Event stream closed");
        self.shutdown().await
    }

    /// Waits for every in-flight publish and returns their outcomes in completion order.
    pub async fn settle_publishes(&mut self) -> Vec<PublishOutcome> {
        let mut outcomes = vec![];
        while let Some(result) = self.publishes.join_next().await {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Metadata publish task failed: {:?}", e),
            }
        }
        outcomes
    }

    /// Cancels both timer families, lets pending publishes finish and reports the session.
    pub async fn shutdown(mut self) -> SessionSummary {
        self.cancel.cancel();
        self.silence.shutdown().await;
        self.settle_publishes().await;
        let clock = self.clock.shutdown().await;

        let summary = SessionSummary {
            final_phase: self.phase.current(),
            case: self.publisher.current().await,
            publishes: self.publisher.publish_count().await,
            clock_prompts: clock.prompts_fired,
        };
        tracing::info!(
            phase = %summary.final_phase,
            publishes = summary.publishes,
            clock_prompts = summary.clock_prompts,
            "Interview session ended"
        );
        summary
    }

    fn reap_publishes(&mut self) {
        while let Some(result) = self.publishes.try_join_next() {
            if let Err(e) = result {
                tracing::error!("Metadata publish task failed: {:?}", e);
            }
        }
    }
}
