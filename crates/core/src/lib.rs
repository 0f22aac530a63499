pub mod case;
pub mod clock;
pub mod phase;
pub mod publisher;
pub mod schedule;
pub mod session;
pub mod silence;
pub mod tool;

/// Represents commands that the interview engine issues to the runtime.
///
/// The engine never talks to the voice platform directly. Every side effect that
/// makes the agent speak goes through this enum, so the runtime decides how the
/// line actually reaches the voice session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Command the runtime to speak the given scripted line to the candidate.
    SpeakText(String),
}

/// Sender half of the prompt delivery sink shared by every timer in a session.
pub type CommandTx = tokio::sync::mpsc::Sender<Command>;

/// Hands a scripted line to the runtime.
///
/// Returns once the line has been queued. A closed sink is logged and swallowed:
/// a missed prompt never tears the session down.
pub(crate) async fn deliver_prompt(command_tx: &CommandTx, text: &str) {
    if let Err(e) = command_tx.send(Command::SpeakText(text.to_string())).await {
        tracing::warn!("Prompt sink closed, dropping prompt {:?}: {}", text, e);
    }
}
