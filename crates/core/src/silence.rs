//! Per-utterance silence nudges.
//!
//! Every time the candidate stops speaking a new silence window opens and a
//! timer task starts counting. If the candidate stays quiet long enough the
//! task asks the runtime to speak a nudge that depends on the interview phase
//! observed at that moment. Speech resuming cancels the window.

use crate::phase::{InterviewPhase, PhaseHandle};
use crate::schedule::{CALCULATION_NUDGE, ESTIMATE_NUDGE, FRAMEWORK_NUDGE, PromptSchedule};
use crate::{CommandTx, deliver_prompt};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// How a silence window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceOutcome {
    /// Speech resumed, a newer window replaced this one, or the session ended.
    Cancelled { prompts_fired: u8 },
    /// The window ran the whole schedule for the phase it observed.
    Completed { prompts_fired: u8 },
}

impl SilenceOutcome {
    pub fn prompts_fired(&self) -> u8 {
        match self {
            SilenceOutcome::Cancelled { prompts_fired }
            | SilenceOutcome::Completed { prompts_fired } => *prompts_fired,
        }
    }
}

/// One uninterrupted span of candidate silence, owned by its timer task.
#[derive(Debug)]
struct SilenceWindow {
    start_time: Instant,
    stages_fired: u8,
}

impl SilenceWindow {
    fn open() -> Self {
        Self {
            start_time: Instant::now(),
            stages_fired: 0,
        }
    }

    async fn fire(&mut self, command_tx: &CommandTx, text: &str) {
        tracing::info!(
            silent_for = ?self.start_time.elapsed(),
            "Silence prompt: {:?}",
            text
        );
        deliver_prompt(command_tx, text).await;
        self.stages_fired += 1;
    }

    fn cancelled(self) -> SilenceOutcome {
        tracing::debug!(
            silent_for = ?self.start_time.elapsed(),
            prompts_fired = self.stages_fired,
            "Silence window cancelled"
        );
        SilenceOutcome::Cancelled {
            prompts_fired: self.stages_fired,
        }
    }

    fn completed(self) -> SilenceOutcome {
        SilenceOutcome::Completed {
            prompts_fired: self.stages_fired,
        }
    }
}

struct PendingTimer {
    cancel: CancellationToken,
    handle: JoinHandle<SilenceOutcome>,
}

/// Owns the single pending silence timer of a session.
///
/// Superseded timers are cancelled before a new one is spawned and kept as
/// retired handles until they finish, so nothing runs detached.
pub struct SilenceTimer {
    phase: PhaseHandle,
    command_tx: CommandTx,
    first: Duration,
    followup: Duration,
    session_cancel: CancellationToken,
    pending: Option<PendingTimer>,
    retired: Vec<JoinHandle<SilenceOutcome>>,
}

impl SilenceTimer {
    pub fn new(
        phase: PhaseHandle,
        command_tx: CommandTx,
        schedule: &PromptSchedule,
        session_cancel: CancellationToken,
    ) -> Self {
        Self {
            phase,
            command_tx,
            first: schedule.silence_first,
            followup: schedule.silence_followup,
            session_cancel,
            pending: None,
            retired: Vec::new(),
        }
    }

    /// Opens a new silence window, cancelling whatever window was pending.
    pub fn on_user_stopped_speaking(&mut self) {
        self.cancel_pending();

        let cancel = self.session_cancel.child_token();
        let handle = tokio::spawn(run_window(
            SilenceWindow::open(),
            self.phase.clone(),
            self.command_tx.clone(),
            self.first,
            self.followup,
            cancel.clone(),
        ));
        tracing::debug!("Silence window opened");
        self.pending = Some(PendingTimer { cancel, handle });
    }

    /// Closes the current silence window. Stages that have not fired yet never will.
    pub fn on_user_started_speaking(&mut self) {
        self.cancel_pending();
    }

    /// True while a window is open and its schedule has not run out.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.cancel.is_cancelled() && !p.handle.is_finished())
    }

    /// Waits for the current window to finish on its own and reports how it ended.
    pub async fn settle(&mut self) -> Option<SilenceOutcome> {
        let pending = self.pending.take()?;
        join_window(pending.handle).await
    }

    /// Cancels every window and waits for all timer tasks, including retired ones.
    pub async fn shutdown(&mut self) -> Vec<SilenceOutcome> {
        self.cancel_pending();
        let mut outcomes = Vec::with_capacity(self.retired.len());
        for handle in self.retired.drain(..) {
            if let Some(outcome) = join_window(handle).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    fn cancel_pending(&mut self) {
        self.retired.retain(|h| !h.is_finished());
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
            if !pending.handle.is_finished() {
                self.retired.push(pending.handle);
            }
        }
    }
}

async fn join_window(handle: JoinHandle<SilenceOutcome>) -> Option<SilenceOutcome> {
    match handle.await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::error!("Silence timer task failed: {:?}", e);
            None
        }
    }
}

async fn run_window(
    mut window: SilenceWindow,
    phase: PhaseHandle,
    command_tx: CommandTx,
    first: Duration,
    followup: Duration,
    cancel: CancellationToken,
) -> SilenceOutcome {
    if !stay_silent(&cancel, first).await {
        return window.cancelled();
    }

    match phase.current() {
        InterviewPhase::Framework => window.fire(&command_tx, FRAMEWORK_NUDGE).await,
        InterviewPhase::Calculations => {
            window.fire(&command_tx, CALCULATION_NUDGE).await;
            if !stay_silent(&cancel, followup).await {
                return window.cancelled();
            }
            window.fire(&command_tx, ESTIMATE_NUDGE).await;
        }
        phase @ (InterviewPhase::Opening | InterviewPhase::WrappingUp) => {
            tracing::debug!(%phase, "No silence prompt for this phase");
        }
    }
    window.completed()
}

/// Sleeps for `delay` unless cancelled first. Returns false when cancelled.
async fn stay_silent(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = sleep(delay) => !cancel.is_cancelled(),
    }
}
