//! Transcription gateway: one multipart upload per finalized recording.

use std::sync::Arc;
use std::time::Duration;

use stylist_client::StylistBackend;
use stylist_core::error::{Result, StylistError};
use stylist_core::types::AudioClip;

/// Talks to `POST /api/transcribe` on behalf of the session.
pub struct TranscriptionGateway<B: StylistBackend> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B: StylistBackend> Clone for TranscriptionGateway<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            timeout: self.timeout,
        }
    }
}

impl<B: StylistBackend> TranscriptionGateway<B> {
    pub fn new(backend: Arc<B>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Upload `audio` and return the transcript.
    ///
    /// Every failure, including an unreachable backend or an expired
    /// timeout, is reported as `StylistError::Transcription`.
    pub async fn transcribe(&self, audio: AudioClip) -> Result<String> {
        let bytes = audio.len();
        let mime_type = audio.mime_type.clone();
        let result = tokio::time::timeout(self.timeout, self.backend.transcribe(audio)).await;

        match result {
            Ok(Ok(transcript)) => {
                tracing::info!(bytes, mime_type = %mime_type, transcript_len = transcript.len(), "Recording transcribed");
                Ok(transcript)
            }
            Ok(Err(StylistError::Transcription(msg))) => Err(StylistError::Transcription(msg)),
            Ok(Err(e)) => Err(StylistError::Transcription(e.to_string())),
            Err(_) => Err(StylistError::Transcription(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylist_client::MockBackend;

    fn gateway(backend: &MockBackend) -> TranscriptionGateway<MockBackend> {
        TranscriptionGateway::new(Arc::new(backend.clone()), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let backend = MockBackend::new();
        backend.push_transcript("a smart casual look for brunch");

        let clip = AudioClip::new(vec![1, 2, 3], "audio/webm");
        let transcript = gateway(&backend).transcribe(clip).await.unwrap();
        assert_eq!(transcript, "a smart casual look for brunch");
        assert_eq!(backend.transcribed()[0].mime_type, "audio/webm");
    }

    #[tokio::test]
    async fn test_transcribe_failures_are_transcription_errors() {
        let backend = MockBackend::new();
        backend.push_transcribe_error(StylistError::Connectivity("refused".into()));
        backend.push_transcribe_error(StylistError::Transcription("API error: 500".into()));
        let gw = gateway(&backend);

        for _ in 0..2 {
            let clip = AudioClip::new(vec![1], "audio/mp4");
            assert!(matches!(
                gw.transcribe(clip).await,
                Err(StylistError::Transcription(_))
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transcribe_timeout() {
        let backend = MockBackend::new();
        backend.push_transcript("late");
        backend.set_transcribe_delay(Duration::from_secs(60));

        let clip = AudioClip::new(vec![1], "audio/webm");
        match gateway(&backend).transcribe(clip).await {
            Err(StylistError::Transcription(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
