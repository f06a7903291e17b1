//! Reply playback. At most one clip plays at a time; a new clip replaces
//! whatever is still playing instead of queueing behind it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use stylist_core::error::StylistError;
use stylist_core::types::AudioClip;

/// Audio output. `play` resolves when the clip has finished playing.
pub trait AudioSink: Send + Sync + 'static {
    fn play(&self, clip: AudioClip) -> impl Future<Output = Result<(), StylistError>> + Send;
}

/// Keeps a single playback task alive.
pub struct PlaybackController<S: AudioSink> {
    sink: Arc<S>,
    current: Option<JoinHandle<()>>,
}

impl<S: AudioSink> std::fmt::Debug for PlaybackController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("playing", &self.is_playing())
            .finish()
    }
}

impl<S: AudioSink> PlaybackController<S> {
    pub fn new(sink: Arc<S>) -> Self {
        Self {
            sink,
            current: None,
        }
    }

    /// Start playing `clip`, abandoning any clip still in progress.
    pub fn play(&mut self, clip: AudioClip) {
        if self.stop() {
            tracing::debug!("Previous reply abandoned");
        }
        let sink = Arc::clone(&self.sink);
        let bytes = clip.len();
        self.current = Some(tokio::spawn(async move {
            match sink.play(clip).await {
                Ok(()) => tracing::debug!(bytes, "Reply playback finished"),
                Err(e) => tracing::warn!(error = %e, "Reply playback failed"),
            }
        }));
    }

    /// Decode a base64 reply and play it. Undecodable payloads are logged
    /// and skipped; returns the decoded size on success.
    pub fn play_encoded(&mut self, encoded: &str, mime_type: &str) -> Option<usize> {
        match AudioClip::from_base64(encoded, mime_type) {
            Ok(clip) if !clip.is_empty() => {
                let len = clip.len();
                self.play(clip);
                Some(len)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable reply audio");
                None
            }
        }
    }

    /// Abandon the current clip. Returns whether one was playing.
    pub fn stop(&mut self) -> bool {
        match self.current.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl<S: AudioSink> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

#[derive(Debug, Default)]
struct MockSinkState {
    started: Vec<AudioClip>,
    completed: usize,
}

/// Mock audio sink that "plays" a clip by sleeping for a fixed duration.
#[derive(Debug, Clone)]
pub struct MockAudioSink {
    duration: Duration,
    state: Arc<Mutex<MockSinkState>>,
}

impl MockAudioSink {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: Arc::new(Mutex::new(MockSinkState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockSinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Clips whose playback began, in order.
    pub fn started(&self) -> Vec<AudioClip> {
        self.lock().started.clone()
    }

    /// Number of clips that played to the end.
    pub fn completed(&self) -> usize {
        self.lock().completed
    }
}

impl AudioSink for MockAudioSink {
    async fn play(&self, clip: AudioClip) -> Result<(), StylistError> {
        self.lock().started.push(clip);
        tokio::time::sleep(self.duration).await;
        self.lock().completed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(byte: u8) -> AudioClip {
        AudioClip::new(vec![byte; 4], "audio/mpeg")
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_to_completion() {
        let sink = MockAudioSink::new(Duration::from_secs(3));
        let mut player = PlaybackController::new(Arc::new(sink.clone()));

        player.play(clip(1));
        tokio::task::yield_now().await;
        assert!(player.is_playing());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!player.is_playing());
        assert_eq!(sink.completed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_clip_replaces_current() {
        let sink = MockAudioSink::new(Duration::from_secs(3));
        let mut player = PlaybackController::new(Arc::new(sink.clone()));

        player.play(clip(1));
        tokio::task::yield_now().await;
        player.play(clip(2));
        tokio::time::sleep(Duration::from_secs(10)).await;

        let started: Vec<u8> = sink.started().iter().map(|c| c.data[0]).collect();
        assert_eq!(started, vec![1, 2]);
        assert_eq!(sink.completed(), 1, "first clip must not finish");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_abandons_playback() {
        let sink = MockAudioSink::new(Duration::from_secs(3));
        let mut player = PlaybackController::new(Arc::new(sink.clone()));

        assert!(!player.stop());
        player.play(clip(1));
        tokio::task::yield_now().await;
        assert!(player.stop());
        assert!(!player.is_playing());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.completed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_encoded_skips_bad_payload() {
        let sink = MockAudioSink::new(Duration::from_millis(10));
        let mut player = PlaybackController::new(Arc::new(sink.clone()));

        assert_eq!(player.play_encoded("%%%not-base64", "audio/mpeg"), None);
        assert!(!player.is_playing());

        assert_eq!(player.play_encoded("SUQz", "audio/mpeg"), Some(3));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.started()[0].data, b"ID3".to_vec());
        assert_eq!(sink.started()[0].mime_type, "audio/mpeg");
    }
}
