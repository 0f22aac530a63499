//! Scripted prompt lines and the delays at which they are spoken.

use std::time::Duration;

pub const FRAMEWORK_NUDGE: &str = "Walk me through your thinking.";
pub const CALCULATION_NUDGE: &str = "Walk me through your calculation out loud.";
pub const ESTIMATE_NUDGE: &str = "What's your best estimate?";

pub const HALFWAY_NOTICE: &str = "We're about halfway through.";
pub const ONE_MINUTE_NOTICE: &str = "You have about one minute remaining.";
pub const WRAP_UP_NOTICE: &str = "Please wrap up your answer.";

/// A prompt spoken at a fixed offset from the session clock origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockStage {
    pub offset: Duration,
    pub text: &'static str,
}

/// Timings for both timer families.
///
/// `Default` is the production schedule: silence nudges at 30s and 45s, clock
/// notices at 150s, 240s and 270s. Stage offsets must be increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSchedule {
    /// Uninterrupted silence before the first nudge.
    pub silence_first: Duration,
    /// Further silence before the estimate nudge in the calculations phase.
    pub silence_followup: Duration,
    pub clock_stages: Vec<ClockStage>,
}

impl Default for PromptSchedule {
    fn default() -> Self {
        Self {
            silence_first: Duration::from_secs(30),
            silence_followup: Duration::from_secs(15),
            clock_stages: vec![
                ClockStage {
                    offset: Duration::from_secs(150),
                    text: HALFWAY_NOTICE,
                },
                ClockStage {
                    offset: Duration::from_secs(240),
                    text: ONE_MINUTE_NOTICE,
                },
                ClockStage {
                    offset: Duration::from_secs(270),
                    text: WRAP_UP_NOTICE,
                },
            ],
        }
    }
}
