use crate::schedule::ClockStage;
use crate::{CommandTx, deliver_prompt};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOutcome {
    pub prompts_fired: usize,
    pub cancelled: bool,
}

/// Time notices spoken at fixed offsets from the session start.
///
/// Runs independently of speech and phase. Each stage is scheduled against
/// an absolute deadline from the origin, so the notices do not drift.
pub struct InterviewClock {
    origin: Instant,
    cancel: CancellationToken,
    handle: JoinHandle<ClockOutcome>,
}

impl InterviewClock {
    pub fn start(
        origin: Instant,
        stages: Vec<ClockStage>,
        command_tx: CommandTx,
        cancel: CancellationToken,
    ) -> Self {
        tracing::debug!(stages = stages.len(), "Interview clock started");
        let handle = tokio::spawn(run_clock(origin, stages, command_tx, cancel.clone()));
        Self {
            origin,
            cancel,
            handle,
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Waits for the clock to run out on its own.
    pub async fn join(self) -> ClockOutcome {
        let cancel = self.cancel.clone();
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Interview clock task failed: {:?}", e);
                ClockOutcome {
                    prompts_fired: 0,
                    cancelled: cancel.is_cancelled(),
                }
            }
        }
    }

    /// Stops any notice that has not fired yet. Only used on session teardown.
    pub async fn shutdown(self) -> ClockOutcome {
        self.cancel.cancel();
        self.join().await
    }
}

async fn run_clock(
    origin: Instant,
    stages: Vec<ClockStage>,
    command_tx: CommandTx,
    cancel: CancellationToken,
) -> ClockOutcome {
    let mut prompts_fired = 0;
    for stage in stages {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(prompts_fired, "Interview clock cancelled");
                return ClockOutcome { prompts_fired, cancelled: true };
            }
            () = sleep_until(origin + stage.offset) => {}
        }

        tracing::info!(elapsed = ?origin.elapsed(), "Clock prompt: {:?}", stage.text);
        deliver_prompt(&command_tx, stage.text).await;
        prompts_fired += 1;
    }
    ClockOutcome {
        prompts_fired,
        cancelled: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;
    use crate::schedule::{HALFWAY_NOTICE, ONE_MINUTE_NOTICE, PromptSchedule, WRAP_UP_NOTICE};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    fn spoken(rx: &mut mpsc::Receiver<Command>) -> Vec<String> {
        let mut lines = vec![];
        while let Ok(Command::SpeakText(text)) = rx.try_recv() {
            lines.push(text);
        }
        lines
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_three_notices_at_fixed_offsets() {
        let (command_tx, mut rx) = mpsc::channel(8);
        let clock = InterviewClock::start(
            Instant::now(),
            PromptSchedule::default().clock_stages,
            command_tx,
            CancellationToken::new(),
        );

        let checkpoints = [
            (149, vec![]),
            (151, vec![HALFWAY_NOTICE]),
            (239, vec![]),
            (241, vec![ONE_MINUTE_NOTICE]),
            (269, vec![]),
            (271, vec![WRAP_UP_NOTICE]),
        ];
        let origin = clock.origin();
        for (at, expected) in checkpoints {
            tokio::time::sleep_until(origin + Duration::from_secs(at)).await;
            assert_eq!(spoken(&mut rx), expected, "at {at}s");
        }

        assert_eq!(
            clock.join().await,
            ClockOutcome {
                prompts_fired: 3,
                cancelled: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_skips_remaining_notices() {
        let (command_tx, mut rx) = mpsc::channel(8);
        let clock = InterviewClock::start(
            Instant::now(),
            PromptSchedule::default().clock_stages,
            command_tx,
            CancellationToken::new(),
        );

        sleep(Duration::from_secs(200)).await;
        let outcome = clock.shutdown().await;
        assert_eq!(
            outcome,
            ClockOutcome {
                prompts_fired: 1,
                cancelled: true
            }
        );

        sleep(Duration::from_secs(300)).await;
        assert_eq!(spoken(&mut rx), vec![HALFWAY_NOTICE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_start_does_not_reorder_stages() {
        // Origin in the past: every deadline is already due, order must hold.
        let (command_tx, mut rx) = mpsc::channel(8);
        sleep(Duration::from_secs(300)).await;
        let origin = Instant::now() - Duration::from_secs(300);
        let clock = InterviewClock::start(
            origin,
            PromptSchedule::default().clock_stages,
            command_tx,
            CancellationToken::new(),
        );

        assert_eq!(clock.join().await.prompts_fired, 3);
        assert_eq!(
            spoken(&mut rx),
            vec![HALFWAY_NOTICE, ONE_MINUTE_NOTICE, WRAP_UP_NOTICE]
        );
    }
}
