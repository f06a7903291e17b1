//! Stylist Client crate - HTTP access to the stylist backend.
//!
//! Defines the [`StylistBackend`] trait covering the three backend routes
//! (health, chat, transcription), a reqwest implementation, and a scripted
//! mock for testing without a running server.

use std::future::Future;

use stylist_core::error::StylistError;
use stylist_core::types::{AudioClip, HealthStatus};

pub mod http;
pub mod mock;
pub mod wire;

pub use http::HttpBackend;
pub use mock::MockBackend;
pub use wire::{ChatRequestBody, ChatResponseBody, TranscribeResponseBody};

// =============================================================================
// Traits
// =============================================================================

/// The stylist backend as seen by the session.
///
/// Implementations own their transport and map failures onto the
/// [`StylistError`] taxonomy: unreachable backends become `Connectivity`,
/// rejected chat calls `ChatRequest`, failed uploads `Transcription`.
pub trait StylistBackend: Send + Sync {
    /// `GET /health`.
    fn health(&self) -> impl Future<Output = Result<HealthStatus, StylistError>> + Send;

    /// `POST /api/chat`.
    fn chat(
        &self,
        request: ChatRequestBody,
    ) -> impl Future<Output = Result<ChatResponseBody, StylistError>> + Send;

    /// `POST /api/transcribe`. Returns the transcript text.
    fn transcribe(
        &self,
        audio: AudioClip,
    ) -> impl Future<Output = Result<String, StylistError>> + Send;
}
