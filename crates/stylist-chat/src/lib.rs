//! Conversational session for the stylist assistant.
//!
//! Provides recommendation normalization, the chat and transcription
//! gateways, and the session orchestrator that serializes user commands,
//! network completions and recording signals into one conversation state.

pub mod gateway;
pub mod normalize;
pub mod orchestrator;
pub mod session;
pub mod transcription;

pub use gateway::{ChatGateway, ChatReply, PreparedChat};
pub use normalize::RecommendationNormalizer;
pub use orchestrator::SessionOrchestrator;
pub use session::{SessionCommand, SessionHandle, SessionState};
pub use transcription::TranscriptionGateway;
