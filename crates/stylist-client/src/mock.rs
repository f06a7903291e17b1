//! Scripted in-memory backend for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use stylist_core::error::StylistError;
use stylist_core::types::{AudioClip, HealthStatus};

use crate::wire::{ChatRequestBody, ChatResponseBody};
use crate::StylistBackend;

const DEFAULT_REPLY: &str = "Here are a few ideas for you.";

#[derive(Debug)]
struct MockState {
    health: Option<HealthStatus>,
    chat_replies: VecDeque<Result<ChatResponseBody, StylistError>>,
    chat_delay: Duration,
    transcripts: VecDeque<Result<String, StylistError>>,
    transcribe_delay: Duration,
    chat_requests: Vec<ChatRequestBody>,
    transcribed: Vec<AudioClip>,
    health_calls: usize,
}

/// Mock backend with scripted replies.
///
/// Clones share state, so a test can keep one handle for scripting and
/// inspection while the session owns another. Chat replies are consumed in
/// order; once the script runs out every call gets a plain text reply.
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A healthy backend with an empty script.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                health: Some(HealthStatus {
                    status: "healthy".to_string(),
                    dataset_size: 44_000,
                    demo_mode: false,
                }),
                chat_replies: VecDeque::new(),
                chat_delay: Duration::ZERO,
                transcripts: VecDeque::new(),
                transcribe_delay: Duration::ZERO,
                chat_requests: Vec::new(),
                transcribed: Vec::new(),
                health_calls: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not cascade into unrelated assertions.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Health payload to answer with. `None` makes the backend unreachable.
    pub fn set_health(&self, health: Option<HealthStatus>) {
        self.lock().health = health;
    }

    pub fn push_chat_reply(&self, reply: ChatResponseBody) {
        self.lock().chat_replies.push_back(Ok(reply));
    }

    pub fn push_chat_error(&self, error: StylistError) {
        self.lock().chat_replies.push_back(Err(error));
    }

    /// Delay applied to every chat call before it answers.
    pub fn set_chat_delay(&self, delay: Duration) {
        self.lock().chat_delay = delay;
    }

    pub fn push_transcript(&self, transcript: impl Into<String>) {
        self.lock().transcripts.push_back(Ok(transcript.into()));
    }

    pub fn push_transcribe_error(&self, error: StylistError) {
        self.lock().transcripts.push_back(Err(error));
    }

    pub fn set_transcribe_delay(&self, delay: Duration) {
        self.lock().transcribe_delay = delay;
    }

    /// Every chat body received so far, in call order.
    pub fn chat_requests(&self) -> Vec<ChatRequestBody> {
        self.lock().chat_requests.clone()
    }

    pub fn chat_calls(&self) -> usize {
        self.lock().chat_requests.len()
    }

    /// Every clip uploaded for transcription so far.
    pub fn transcribed(&self) -> Vec<AudioClip> {
        self.lock().transcribed.clone()
    }

    pub fn transcribe_calls(&self) -> usize {
        self.lock().transcribed.len()
    }

    pub fn health_calls(&self) -> usize {
        self.lock().health_calls
    }
}

impl StylistBackend for MockBackend {
    async fn health(&self) -> Result<HealthStatus, StylistError> {
        let mut state = self.lock();
        state.health_calls += 1;
        state
            .health
            .clone()
            .ok_or_else(|| StylistError::Connectivity("mock backend unreachable".to_string()))
    }

    async fn chat(&self, request: ChatRequestBody) -> Result<ChatResponseBody, StylistError> {
        let (delay, reply) = {
            let mut state = self.lock();
            state.chat_requests.push(request);
            (state.chat_delay, state.chat_replies.pop_front())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply.unwrap_or_else(|| Ok(ChatResponseBody::text(DEFAULT_REPLY)))
    }

    async fn transcribe(&self, audio: AudioClip) -> Result<String, StylistError> {
        let (delay, transcript) = {
            let mut state = self.lock();
            state.transcribed.push(audio);
            (state.transcribe_delay, state.transcripts.pop_front())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        transcript.unwrap_or_else(|| Err(StylistError::Transcription("no transcript scripted".to_string())))
    }
}
