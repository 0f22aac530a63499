use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Words that signal the candidate has moved from structuring into arithmetic.
pub const CALCULATION_KEYWORDS: &[&str] = &[
    "multiply",
    "divide",
    "calculate",
    "times",
    "equals",
    "million",
    "billion",
    "thousand",
    "percent",
];

/// Phrases that signal the candidate is landing on an answer.
pub const WRAP_UP_KEYWORDS: &[&str] = &[
    "final answer",
    "in conclusion",
    "to summarize",
    "my answer is",
    "estimate is",
    "result is",
];

/// Coarse stage of the case interview. Ordering follows the interview flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InterviewPhase {
    Opening,
    Framework,
    Calculations,
    WrappingUp,
}

impl InterviewPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewPhase::Opening => "opening",
            InterviewPhase::Framework => "framework",
            InterviewPhase::Calculations => "calculations",
            InterviewPhase::WrappingUp => "wrapping_up",
        }
    }
}

impl fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holds the current phase and the rules for moving it forward.
///
/// The phase only ever moves forward. Keyword detection is a plain
/// case-insensitive substring match and will occasionally misfire on
/// incidental words; that is accepted.
#[derive(Debug)]
pub struct PhaseTracker {
    phase: InterviewPhase,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            phase: InterviewPhase::Opening,
        }
    }

    pub fn current_phase(&self) -> InterviewPhase {
        self.phase
    }

    /// Moves opening to framework once the case question is published.
    /// No-op once the interview is past the opening.
    pub fn advance_on_metadata_set(&mut self) -> InterviewPhase {
        if self.phase == InterviewPhase::Opening {
            self.transition(InterviewPhase::Framework, "case metadata published");
        }
        self.phase
    }

    /// Scans a finalized transcript for the keyword set of the current phase and
    /// advances at most one step.
    pub fn advance_on_transcript(&mut self, text: &str) -> InterviewPhase {
        let (keywords, next) = match self.phase {
            InterviewPhase::Framework => (CALCULATION_KEYWORDS, InterviewPhase::Calculations),
            InterviewPhase::Calculations => (WRAP_UP_KEYWORDS, InterviewPhase::WrappingUp),
            InterviewPhase::Opening | InterviewPhase::WrappingUp => return self.phase,
        };

        let lowered = text.to_lowercase();
        if let Some(keyword) = keywords.iter().find(|k| lowered.contains(*k)) {
            self.transition(next, keyword);
        }
        self.phase
    }

    fn transition(&mut self, next: InterviewPhase, reason: &str) {
        debug_assert!(next > self.phase, "interview phase must only move forward");
        tracing::info!(from = %self.phase, to = %next, reason, "Interview phase advanced");
        self.phase = next;
    }
}

/// Cloneable handle to a session's [`PhaseTracker`].
///
/// The publisher writes opening to framework, the transcript path writes the
/// later steps, and the silence timer only reads. Critical sections never span
/// an `.await`.
#[derive(Debug, Clone, Default)]
pub struct PhaseHandle {
    inner: Arc<Mutex<PhaseTracker>>,
}

impl PhaseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> InterviewPhase {
        self.with(|tracker| tracker.current_phase())
    }

    pub fn advance_on_metadata_set(&self) -> InterviewPhase {
        self.with(PhaseTracker::advance_on_metadata_set)
    }

    pub fn advance_on_transcript(&self, text: &str) -> InterviewPhase {
        self.with(|tracker| tracker.advance_on_transcript(text))
    }

    fn with<T>(&self, f: impl FnOnce(&mut PhaseTracker) -> T) -> T {
        // A panic while holding the lock cannot leave the phase half-written.
        let mut tracker = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_in(phase: InterviewPhase) -> PhaseTracker {
        PhaseTracker { phase }
    }

    #[test]
    fn test_starts_in_opening() {
        assert_eq!(PhaseTracker::new().current_phase(), InterviewPhase::Opening);
    }

    #[test]
    fn test_metadata_set_is_idempotent() {
        let mut tracker = PhaseTracker::new();
        assert_eq!(tracker.advance_on_metadata_set(), InterviewPhase::Framework);
        assert_eq!(tracker.advance_on_metadata_set(), InterviewPhase::Framework);

        let mut later = tracker_in(InterviewPhase::Calculations);
        assert_eq!(later.advance_on_metadata_set(), InterviewPhase::Calculations);
    }

    #[test]
    fn test_calculation_keywords_advance_framework_once() {
        let mut tracker = tracker_in(InterviewPhase::Framework);
        let text = "let's multiply 10 million by 2 percent";

        assert_eq!(tracker.advance_on_transcript(text), InterviewPhase::Calculations);
        // The same words carry no wrap-up phrase, so a repeat stays put.
        assert_eq!(tracker.advance_on_transcript(text), InterviewPhase::Calculations);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let mut tracker = tracker_in(InterviewPhase::Calculations);
        assert_eq!(
            tracker.advance_on_transcript("So My Final Answer is about 3 billion"),
            InterviewPhase::WrappingUp
        );
    }

    #[test]
    fn test_advances_at_most_one_step_per_call() {
        let mut tracker = tracker_in(InterviewPhase::Framework);
        // Contains both a calculation keyword and a wrap-up phrase.
        let text = "in conclusion, ten thousand times four";
        assert_eq!(tracker.advance_on_transcript(text), InterviewPhase::Calculations);
        assert_eq!(tracker.advance_on_transcript(text), InterviewPhase::WrappingUp);
    }

    #[test]
    fn test_no_keywords_checked_in_opening_or_wrapping_up() {
        let mut opening = PhaseTracker::new();
        assert_eq!(
            opening.advance_on_transcript("multiply, final answer"),
            InterviewPhase::Opening
        );

        let mut done = tracker_in(InterviewPhase::WrappingUp);
        assert_eq!(
            done.advance_on_transcript("let me calculate again"),
            InterviewPhase::WrappingUp
        );
    }

    #[test]
    fn test_phase_never_regresses() {
        let transcripts = [
            "hello there",
            "I would segment by age",
            "multiply that by two",
            "what about the framework",
            "my answer is 5 million",
            "let me calculate once more",
            "",
        ];
        let mut tracker = PhaseTracker::new();
        tracker.advance_on_metadata_set();
        let mut previous = tracker.current_phase();
        for text in transcripts {
            let phase = tracker.advance_on_transcript(text);
            assert!(phase >= previous, "phase went from {previous} to {phase}");
            previous = phase;
        }
        assert_eq!(previous, InterviewPhase::WrappingUp);
    }

    #[test]
    fn test_handle_shares_state_between_clones() {
        let handle = PhaseHandle::new();
        let reader = handle.clone();
        handle.advance_on_metadata_set();
        assert_eq!(reader.current(), InterviewPhase::Framework);
    }
}
