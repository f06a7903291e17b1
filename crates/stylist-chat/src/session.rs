//! Session state, commands and the handle used to send them.

use tokio::sync::mpsc;

use stylist_core::catalog::NormalizedItem;
use stylist_core::error::StylistError;
use stylist_core::types::{
    ConnectionStatus, ConversationTurn, EventContext, HealthStatus, ImageAttachment,
    RenderedMessage,
};

use crate::gateway::ChatReply;

// =============================================================================
// State
// =============================================================================

/// Everything one conversation owns. Mutated only by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub(crate) history: Vec<ConversationTurn>,
    pub(crate) view: Vec<RenderedMessage>,
    pub(crate) input: String,
    pub(crate) pending_image: Option<ImageAttachment>,
    pub(crate) processing: bool,
    pub(crate) recommendations: Vec<NormalizedItem>,
    pub(crate) event_context: Option<EventContext>,
    pub(crate) connection: ConnectionStatus,
    pub(crate) demo_mode: bool,
    pub(crate) dataset_size: Option<u64>,
}

impl SessionState {
    /// Turns sent to the backend as history, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// The rendered conversation, including welcome and apology messages.
    pub fn view(&self) -> &[RenderedMessage] {
        &self.view
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn pending_image(&self) -> Option<&ImageAttachment> {
        self.pending_image.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn recommendations(&self) -> &[NormalizedItem] {
        &self.recommendations
    }

    pub fn event_context(&self) -> Option<&EventContext> {
        self.event_context.as_ref()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    /// Catalog size reported by the last healthy check.
    pub fn dataset_size(&self) -> Option<u64> {
        self.dataset_size
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Requests the rendering layer can make of a session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Submit {
        text: String,
        image: Option<ImageAttachment>,
    },
    SetInput(String),
    /// Submit the current input together with the pending image.
    SendInput,
    AttachImage(ImageAttachment),
    ClearImage,
    StartRecording,
    StopRecording,
    CancelRecording,
    ClearRecommendations,
    CheckConnection,
    Shutdown,
}

/// Messages consumed by `SessionOrchestrator::step`.
#[derive(Debug)]
pub(crate) enum Inbox {
    Command(SessionCommand),
    ChatFinished(Result<ChatReply, StylistError>),
    TranscriptionFinished(Result<String, StylistError>),
    HealthChecked(Result<HealthStatus, StylistError>),
    AutoSend,
}

/// Cloneable sender of [`SessionCommand`]s.
///
/// Every method returns `false` once the session has gone away.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub(crate) tx: mpsc::UnboundedSender<Inbox>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(Inbox::Command(command)).is_ok()
    }

    pub fn submit(&self, text: impl Into<String>, image: Option<ImageAttachment>) -> bool {
        self.send(SessionCommand::Submit {
            text: text.into(),
            image,
        })
    }

    pub fn set_input(&self, text: impl Into<String>) -> bool {
        self.send(SessionCommand::SetInput(text.into()))
    }

    pub fn send_input(&self) -> bool {
        self.send(SessionCommand::SendInput)
    }

    pub fn attach_image(&self, image: ImageAttachment) -> bool {
        self.send(SessionCommand::AttachImage(image))
    }

    pub fn clear_image(&self) -> bool {
        self.send(SessionCommand::ClearImage)
    }

    pub fn start_recording(&self) -> bool {
        self.send(SessionCommand::StartRecording)
    }

    pub fn stop_recording(&self) -> bool {
        self.send(SessionCommand::StopRecording)
    }

    pub fn cancel_recording(&self) -> bool {
        self.send(SessionCommand::CancelRecording)
    }

    pub fn clear_recommendations(&self) -> bool {
        self.send(SessionCommand::ClearRecommendations)
    }

    pub fn check_connection(&self) -> bool {
        self.send(SessionCommand::CheckConnection)
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionCommand::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
