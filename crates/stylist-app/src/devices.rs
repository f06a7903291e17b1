//! File-backed audio devices for the console.
//!
//! The terminal has no microphone prompt or speaker of its own, so a
//! recording is streamed from an audio file chosen with `/record` and
//! spoken replies are written to disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stylist_audio::{AudioSink, DeviceLease, FragmentSink, MicrophoneDevice};
use stylist_core::error::StylistError;
use stylist_core::types::{AudioClip, CaptureFormat};

/// Size of each fragment pushed to the recorder.
const FRAGMENT_BYTES: usize = 16 * 1024;

/// Pause between fragments, roughly the cadence of a live encoder.
const FRAGMENT_INTERVAL: Duration = Duration::from_millis(250);

// =============================================================================
// Microphone
// =============================================================================

/// Streams a pre-recorded file as if it were live capture.
///
/// A source must be armed with [`FileMicrophone::arm`] before recording
/// starts; without one the request is treated as a denied permission.
#[derive(Debug, Clone, Default)]
pub struct FileMicrophone {
    source: Arc<Mutex<Option<PathBuf>>>,
}

impl FileMicrophone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the file streamed by the next recording.
    pub fn arm(&self, path: impl Into<PathBuf>) {
        *self.source.lock().unwrap_or_else(|e| e.into_inner()) = Some(path.into());
    }

    fn armed(&self) -> Option<PathBuf> {
        self.source.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn is_webm(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("webm"))
}

impl MicrophoneDevice for FileMicrophone {
    fn supports(&self, format: CaptureFormat) -> bool {
        match format {
            CaptureFormat::Webm => self.armed().is_some_and(|path| is_webm(&path)),
            CaptureFormat::Mp4 => true,
        }
    }

    async fn request_access(
        &self,
        format: CaptureFormat,
        sink: FragmentSink,
    ) -> Result<DeviceLease, StylistError> {
        let path = self
            .source
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| StylistError::Permission("no audio file selected".to_string()))?;

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            StylistError::Device(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::info!(
            path = %path.display(),
            bytes = bytes.len(),
            format = format.mime_type(),
            session_id = %sink.session_id(),
            "Streaming audio file as microphone input"
        );

        let task = tokio::spawn(async move {
            for chunk in bytes.chunks(FRAGMENT_BYTES) {
                if !sink.push(chunk.to_vec()) {
                    return;
                }
                tokio::time::sleep(FRAGMENT_INTERVAL).await;
            }
            tracing::debug!("Audio file fully streamed");
        });
        Ok(DeviceLease::new(move || task.abort()))
    }
}

// =============================================================================
// Speaker
// =============================================================================

/// Writes each spoken reply to `<dir>/reply-<n>.<ext>`.
#[derive(Debug)]
pub struct FileAudioSink {
    dir: PathBuf,
    written: AtomicUsize,
}

impl FileAudioSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        "audio/mp4" => "m4a",
        _ => "bin",
    }
}

impl AudioSink for FileAudioSink {
    async fn play(&self, clip: AudioClip) -> Result<(), StylistError> {
        let n = self.written.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("reply-{}.{}", n, extension_for(&clip.mime_type)));
        tokio::fs::write(&path, &clip.data).await?;
        tracing::info!(path = %path.display(), bytes = clip.len(), "Spoken reply saved");
        Ok(())
    }
}
