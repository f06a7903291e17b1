use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::NormalizedItem;
use crate::types::{ConnectionStatus, EventContext, MessageKind, Notice, Timestamp};

/// Everything the rendering layer can observe about a session.
///
/// Events are emitted by the orchestrator after each state change, in the
/// order the changes happened, and fan out over a broadcast channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    // =========================================================================
    // Conversation Events
    // =========================================================================
    /// A message was appended to the rendered conversation view.
    MessageRendered {
        kind: MessageKind,
        text: String,
        has_image: bool,
        timestamp: Timestamp,
    },

    /// The `processing` gate opened or closed.
    ProcessingChanged { processing: bool },

    /// The input box content was replaced (by a transcript, or cleared after a send).
    InputChanged { text: String },

    /// An image was attached or removed.
    PendingImageChanged { attached: bool },

    /// The backend returned a fresh list of recommendations.
    RecommendationsUpdated { items: Vec<NormalizedItem> },

    /// The backend described the event the user is shopping for.
    EventContextUpdated { context: EventContext },

    /// Recommendations and event context were cleared.
    RecommendationsCleared,

    // =========================================================================
    // Recording Events
    // =========================================================================
    /// Microphone access was granted and capture began.
    RecordingStarted {
        session_id: Uuid,
        mime_type: String,
        timestamp: Timestamp,
    },

    /// One-second heartbeat of an active recording.
    RecordingTick { session_id: Uuid, elapsed_secs: u64 },

    /// Capture ended and the device was released.
    RecordingStopped {
        session_id: Uuid,
        chunk_count: usize,
        byte_count: usize,
        duration_secs: f64,
        timestamp: Timestamp,
    },

    /// The maximum recording duration elapsed. Followed by `RecordingStopped`.
    RecordingTimedOut {
        session_id: Uuid,
        max_duration_secs: u64,
        timestamp: Timestamp,
    },

    /// Capture was cancelled and its audio discarded.
    RecordingCancelled {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// The backend transcribed a recording.
    TranscriptReady { text: String },

    // =========================================================================
    // Output Events
    // =========================================================================
    /// A synthesized reply started playing, replacing any earlier one.
    PlaybackStarted { byte_count: usize },

    /// Backend reachability changed.
    ConnectionChanged {
        status: ConnectionStatus,
        dataset_size: Option<u64>,
        demo_mode: bool,
    },

    /// A toast for the user.
    Notice(Notice),
}

impl SessionEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::MessageRendered { .. } => "message_rendered",
            SessionEvent::ProcessingChanged { .. } => "processing_changed",
            SessionEvent::InputChanged { .. } => "input_changed",
            SessionEvent::PendingImageChanged { .. } => "pending_image_changed",
            SessionEvent::RecommendationsUpdated { .. } => "recommendations_updated",
            SessionEvent::EventContextUpdated { .. } => "event_context_updated",
            SessionEvent::RecommendationsCleared => "recommendations_cleared",
            SessionEvent::RecordingStarted { .. } => "recording_started",
            SessionEvent::RecordingTick { .. } => "recording_tick",
            SessionEvent::RecordingStopped { .. } => "recording_stopped",
            SessionEvent::RecordingTimedOut { .. } => "recording_timed_out",
            SessionEvent::RecordingCancelled { .. } => "recording_cancelled",
            SessionEvent::TranscriptReady { .. } => "transcript_ready",
            SessionEvent::PlaybackStarted { .. } => "playback_started",
            SessionEvent::ConnectionChanged { .. } => "connection_changed",
            SessionEvent::Notice(_) => "notice",
        }
    }

    /// The recording session this event belongs to, if any.
    pub fn recording_session(&self) -> Option<Uuid> {
        match self {
            SessionEvent::RecordingStarted { session_id, .. }
            | SessionEvent::RecordingTick { session_id, .. }
            | SessionEvent::RecordingStopped { session_id, .. }
            | SessionEvent::RecordingTimedOut { session_id, .. }
            | SessionEvent::RecordingCancelled { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }
}
