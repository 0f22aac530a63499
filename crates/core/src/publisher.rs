use crate::case::{CaseArgs, CaseMetadata, RoomMetadataRecord};
use crate::phase::PhaseHandle;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("room service transport error: {0}")]
    Transport(String),
    #[error("room service rejected the update ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to serialize room metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

// The `RoomService` trait is the only way the engine reaches the hosted room
// state. The runtime provides a real client; tests use the generated
// `MockRoomService` to script successes and failures.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RoomService: Send + Sync {
    /// Replaces the room's metadata with the given serialized record.
    async fn update_room_metadata(&self, room: &str, metadata: &str) -> Result<(), PublishError>;
}

/// What one tool invocation led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Question or difficulty still unknown; nothing was sent.
    Incomplete,
    /// The record already in the room matches; nothing was sent.
    Unchanged,
    /// The record was written. `first` is true for the first successful publish of the session.
    Published {
        record: RoomMetadataRecord,
        first: bool,
    },
    /// The room service failed. The metadata stays in memory for the next invocation.
    Failed(String),
    /// A later invocation was already applied; these arguments were dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct PublisherState {
    case: CaseMetadata,
    // Sequence number of the newest invocation applied so far.
    applied: Option<u64>,
    published: Option<RoomMetadataRecord>,
    publish_count: usize,
}

/// Keeps a session's case metadata and mirrors it into room state.
pub struct MetadataPublisher {
    room: String,
    service: Arc<dyn RoomService>,
    phase: PhaseHandle,
    issued: AtomicU64,
    // Held across the publish call so two publishes never overlap.
    state: Mutex<PublisherState>,
}

impl MetadataPublisher {
    pub fn new(room: impl Into<String>, service: Arc<dyn RoomService>, phase: PhaseHandle) -> Self {
        Self {
            room: room.into(),
            service,
            phase,
            issued: AtomicU64::new(0),
            state: Mutex::new(PublisherState::default()),
        }
    }

    /// Reserves the sequence number for a tool invocation in arrival order.
    ///
    /// Must be called synchronously when the invocation arrives, before the
    /// publish is handed to another task.
    pub fn begin_invocation(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::Relaxed)
    }

    /// Stores the tool arguments and publishes them once both fields are known.
    ///
    /// `seq` comes from [`begin_invocation`](Self::begin_invocation). An
    /// invocation older than one already applied is dropped, so the newest
    /// arguments always win regardless of which task reaches the lock first.
    /// The first successful publish moves the interview from opening to framework.
    /// Failures are logged and reported in the outcome; they never propagate.
    pub async fn on_tool_invoked(&self, seq: u64, args: CaseArgs) -> PublishOutcome {
        let mut state = self.state.lock().await;
        if state.applied.is_some_and(|applied| seq < applied) {
            tracing::debug!(seq, "Newer case metadata already applied, dropping invocation");
            return PublishOutcome::Superseded;
        }
        state.applied = Some(seq);
        state.case = CaseMetadata::from_args(&args);

        let Some(record) = state.case.record() else {
            tracing::warn!(
                question = ?state.case.question,
                difficulty = ?args.difficulty,
                "Case metadata incomplete, withholding publish"
            );
            return PublishOutcome::Incomplete;
        };

        if state.published.as_ref() == Some(&record) {
            tracing::debug!("Case metadata unchanged, skipping publish");
            return PublishOutcome::Unchanged;
        }

        let metadata = match record.to_json() {
            Ok(json) => json,
            Err(e) => {
                let e = PublishError::from(e);
                tracing::error!("Failed to set room metadata: {}", e);
                return PublishOutcome::Failed(e.to_string());
            }
        };

        if let Err(e) = self
            .service
            .update_room_metadata(&self.room, &metadata)
            .await
        {
            tracing::error!(room = %self.room, "Failed to set room metadata: {}", e);
            return PublishOutcome::Failed(e.to_string());
        }

        let first = state.published.is_none();
        state.published = Some(record.clone());
        state.publish_count += 1;
        tracing::info!(
            room = %self.room,
            question = %record.case_question,
            difficulty = %record.difficulty,
            "Room metadata set"
        );

        if first {
            self.phase.advance_on_metadata_set();
        }
        PublishOutcome::Published { record, first }
    }

    pub async fn current(&self) -> CaseMetadata {
        self.state.lock().await.case.clone()
    }

    pub async fn publish_count(&self) -> usize {
        self.state.lock().await.publish_count
    }
}
