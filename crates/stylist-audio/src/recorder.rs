//! Recording controller managing one microphone capture session at a time.
//!
//! The controller never blocks. Slow or timed work (the permission prompt,
//! the elapsed-time heartbeat, the maximum-duration deadline) runs on
//! spawned tasks that report back as [`RecorderSignal`]s. The owner feeds
//! those signals to [`RecordingController::handle_signal`] on its own task,
//! so every state change happens in one place. Signals tagged with a
//! session id other than the active one are dropped.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use stylist_core::config::RecordingConfig;
use stylist_core::error::StylistError;
use stylist_core::events::SessionEvent;
use stylist_core::types::{AudioClip, CaptureFormat, Timestamp};

use crate::device::{DeviceLease, FragmentSink, MicrophoneDevice};
use crate::state::RecordingState;

// =============================================================================
// Signals and outcomes
// =============================================================================

/// Messages from spawned recording tasks back to the controller.
#[derive(Debug)]
pub enum RecorderSignal {
    /// The permission prompt was answered.
    AccessResolved {
        session_id: Uuid,
        format: CaptureFormat,
        result: Result<DeviceLease, StylistError>,
    },
    /// The device captured a fragment.
    Fragment { session_id: Uuid, bytes: Vec<u8> },
    /// Elapsed-time heartbeat.
    Tick { session_id: Uuid },
    /// The maximum recording duration elapsed.
    Deadline { session_id: Uuid },
}

impl RecorderSignal {
    pub fn session_id(&self) -> Uuid {
        match self {
            RecorderSignal::AccessResolved { session_id, .. }
            | RecorderSignal::Fragment { session_id, .. }
            | RecorderSignal::Tick { session_id }
            | RecorderSignal::Deadline { session_id } => *session_id,
        }
    }
}

/// Result of ending a capture session through `stop()`.
#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// Audio was captured and concatenated. The controller stays in
    /// `Finalizing` until [`RecordingController::finish`] is called.
    Finalized { session_id: Uuid, clip: AudioClip },
    /// Nothing was captured. The controller is already back in `Idle`.
    Empty { session_id: Uuid },
}

/// What a processed signal changed.
#[derive(Debug)]
pub enum RecorderUpdate {
    /// Stale or irrelevant signal. Nothing changed.
    Ignored,
    /// Access was granted and capture began.
    Started {
        session_id: Uuid,
        format: CaptureFormat,
    },
    /// Access was denied or the device failed. The controller is `Idle`.
    Failed(StylistError),
    /// A fragment was buffered.
    Buffered { session_id: Uuid, byte_count: usize },
    /// Heartbeat for the active session.
    Tick { session_id: Uuid, elapsed_secs: u64 },
    /// The deadline stopped the session.
    TimedOut(StopOutcome),
}

// =============================================================================
// Session
// =============================================================================

/// Data owned by the controller while capture is active.
#[derive(Debug)]
struct RecordingSession {
    id: Uuid,
    started_at: Instant,
    chunks: Vec<Vec<u8>>,
    format: CaptureFormat,
    lease: DeviceLease,
    timers: Vec<JoinHandle<()>>,
}

impl RecordingSession {
    fn byte_count(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Abort timers and give the device back.
    fn shut_down(self) -> (Vec<Vec<u8>>, f64) {
        for timer in &self.timers {
            timer.abort();
        }
        self.lease.release();
        (self.chunks, self.started_at.elapsed().as_secs_f64())
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Drives the recording lifecycle over a [`MicrophoneDevice`].
pub struct RecordingController<M: MicrophoneDevice> {
    mic: Arc<M>,
    config: RecordingConfig,
    signal_tx: mpsc::UnboundedSender<RecorderSignal>,
    events: broadcast::Sender<SessionEvent>,
    state: RecordingState,
    /// Session id of the outstanding permission request.
    pending: Option<(Uuid, JoinHandle<()>)>,
    session: Option<RecordingSession>,
}

impl<M: MicrophoneDevice> std::fmt::Debug for RecordingController<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingController")
            .field("state", &self.state)
            .field("pending", &self.pending.as_ref().map(|(id, _)| id))
            .field("session", &self.session.as_ref().map(|s| s.id))
            .finish()
    }
}

impl<M: MicrophoneDevice> RecordingController<M> {
    /// `signal_tx` must feed back into [`handle_signal`](Self::handle_signal).
    pub fn new(
        mic: Arc<M>,
        config: RecordingConfig,
        signal_tx: mpsc::UnboundedSender<RecorderSignal>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            mic,
            config,
            signal_tx,
            events,
            state: RecordingState::Idle,
            pending: None,
            session: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Id of the active capture session, if recording.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Seconds elapsed in the active capture session.
    pub fn elapsed_secs(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.started_at.elapsed().as_secs())
    }

    /// Mime type negotiated for the active capture session.
    pub fn mime_type(&self) -> Option<&'static str> {
        self.session.as_ref().map(|s| s.format.mime_type())
    }

    fn transition(&mut self, target: RecordingState) {
        match self.state.check_transition(target) {
            Ok(()) => {
                tracing::debug!("Recording state: {} -> {}", self.state, target);
            }
            Err(e) => {
                tracing::error!(error = %e, "Forcing recording state");
            }
        }
        self.state = target;
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn negotiate_format(&self) -> CaptureFormat {
        if self.mic.supports(CaptureFormat::Webm) {
            CaptureFormat::Webm
        } else {
            CaptureFormat::Mp4
        }
    }

    /// Begin a capture session.
    ///
    /// Only acts from `Idle`; anywhere else it is a no-op. Returns the state
    /// after the call. Access is requested on a spawned task whose answer
    /// arrives as [`RecorderSignal::AccessResolved`].
    pub fn start(&mut self) -> RecordingState {
        if self.state != RecordingState::Idle {
            tracing::debug!(state = %self.state, "Recording start ignored");
            return self.state;
        }

        let session_id = Uuid::new_v4();
        let format = self.negotiate_format();
        self.transition(RecordingState::AwaitingPermission);

        let mic = Arc::clone(&self.mic);
        let tx = self.signal_tx.clone();
        let sink = FragmentSink::new(session_id, tx.clone());
        let task = tokio::spawn(async move {
            let result = mic.request_access(format, sink).await;
            // If the controller is gone the returned signal is dropped, and
            // the lease inside it with it.
            let _ = tx.send(RecorderSignal::AccessResolved {
                session_id,
                format,
                result,
            });
        });
        self.pending = Some((session_id, task));

        tracing::info!(session_id = %session_id, mime_type = format.mime_type(), "Requesting microphone access");
        self.state
    }

    /// Apply one signal from a spawned task.
    pub fn handle_signal(&mut self, signal: RecorderSignal) -> RecorderUpdate {
        match signal {
            RecorderSignal::AccessResolved {
                session_id,
                format,
                result,
            } => self.on_access_resolved(session_id, format, result),
            RecorderSignal::Fragment { session_id, bytes } => self.on_fragment(session_id, bytes),
            RecorderSignal::Tick { session_id } => match self.active_session(session_id) {
                Some(session) => {
                    let elapsed_secs = session.started_at.elapsed().as_secs();
                    self.emit(SessionEvent::RecordingTick {
                        session_id,
                        elapsed_secs,
                    });
                    RecorderUpdate::Tick {
                        session_id,
                        elapsed_secs,
                    }
                }
                None => RecorderUpdate::Ignored,
            },
            RecorderSignal::Deadline { session_id } => {
                if self.active_session(session_id).is_none() {
                    tracing::debug!(session_id = %session_id, "Stale recording deadline dropped");
                    return RecorderUpdate::Ignored;
                }
                tracing::info!(
                    session_id = %session_id,
                    max_duration_secs = self.config.max_duration_secs,
                    "Recording reached maximum duration"
                );
                self.emit(SessionEvent::RecordingTimedOut {
                    session_id,
                    max_duration_secs: self.config.max_duration_secs,
                    timestamp: Timestamp::now(),
                });
                match self.stop() {
                    Some(outcome) => RecorderUpdate::TimedOut(outcome),
                    None => RecorderUpdate::Ignored,
                }
            }
        }
    }

    fn active_session(&self, session_id: Uuid) -> Option<&RecordingSession> {
        if self.state != RecordingState::Recording {
            return None;
        }
        self.session.as_ref().filter(|s| s.id == session_id)
    }

    fn on_access_resolved(
        &mut self,
        session_id: Uuid,
        format: CaptureFormat,
        result: Result<DeviceLease, StylistError>,
    ) -> RecorderUpdate {
        let expected = matches!(&self.pending, Some((id, _)) if *id == session_id);
        if self.state != RecordingState::AwaitingPermission || !expected {
            tracing::debug!(session_id = %session_id, "Stale access answer dropped");
            // A stale lease is released by dropping it here.
            return RecorderUpdate::Ignored;
        }
        self.pending = None;

        let lease = match result {
            Ok(lease) => lease,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Microphone access failed");
                self.transition(RecordingState::Idle);
                return RecorderUpdate::Failed(e);
            }
        };

        let started_at = Instant::now();
        let timers = vec![
            self.spawn_ticker(session_id, started_at),
            self.spawn_deadline(session_id, started_at),
        ];
        self.session = Some(RecordingSession {
            id: session_id,
            started_at,
            chunks: Vec::new(),
            format,
            lease,
            timers,
        });
        self.transition(RecordingState::Recording);

        tracing::info!(session_id = %session_id, mime_type = format.mime_type(), "Recording started");
        self.emit(SessionEvent::RecordingStarted {
            session_id,
            mime_type: format.mime_type().to_string(),
            timestamp: Timestamp::now(),
        });
        RecorderUpdate::Started { session_id, format }
    }

    fn spawn_ticker(&self, session_id: Uuid, started_at: Instant) -> JoinHandle<()> {
        let period = self.config.tick_interval();
        let tx = self.signal_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(started_at + period, period);
            loop {
                interval.tick().await;
                if tx.send(RecorderSignal::Tick { session_id }).is_err() {
                    break;
                }
            }
        })
    }

    fn spawn_deadline(&self, session_id: Uuid, started_at: Instant) -> JoinHandle<()> {
        let deadline = started_at + self.config.max_duration();
        let tx = self.signal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(RecorderSignal::Deadline { session_id });
        })
    }

    fn on_fragment(&mut self, session_id: Uuid, bytes: Vec<u8>) -> RecorderUpdate {
        if bytes.is_empty() {
            return RecorderUpdate::Ignored;
        }
        if self.state != RecordingState::Recording {
            tracing::debug!(session_id = %session_id, state = %self.state, "Fragment outside recording dropped");
            return RecorderUpdate::Ignored;
        }
        match self.session.as_mut() {
            Some(session) if session.id == session_id => {
                session.chunks.push(bytes);
                RecorderUpdate::Buffered {
                    session_id,
                    byte_count: session.byte_count(),
                }
            }
            _ => {
                tracing::debug!(session_id = %session_id, "Fragment for stale session dropped");
                RecorderUpdate::Ignored
            }
        }
    }

    /// End capture and produce the recorded clip.
    ///
    /// Only acts from `Recording`; returns `None` anywhere else. Timers are
    /// cancelled and the device is released before the state changes. A
    /// session with no audio goes straight back to `Idle`.
    pub fn stop(&mut self) -> Option<StopOutcome> {
        if self.state != RecordingState::Recording {
            tracing::debug!(state = %self.state, "Recording stop ignored");
            return None;
        }
        let session = self.session.take()?;
        let session_id = session.id;
        let format = session.format;
        let (chunks, duration_secs) = session.shut_down();
        self.transition(RecordingState::Finalizing);

        let chunk_count = chunks.len();
        let data = chunks.concat();
        tracing::info!(
            session_id = %session_id,
            chunk_count,
            byte_count = data.len(),
            duration_secs,
            "Recording stopped"
        );
        self.emit(SessionEvent::RecordingStopped {
            session_id,
            chunk_count,
            byte_count: data.len(),
            duration_secs,
            timestamp: Timestamp::now(),
        });

        if data.is_empty() {
            self.transition(RecordingState::Idle);
            return Some(StopOutcome::Empty { session_id });
        }
        Some(StopOutcome::Finalized {
            session_id,
            clip: AudioClip::new(data, format.mime_type()),
        })
    }

    /// Abandon capture and discard buffered audio.
    ///
    /// Only acts from `Recording`. Returns whether a session was cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.state != RecordingState::Recording {
            tracing::debug!(state = %self.state, "Recording cancel ignored");
            return false;
        }
        let Some(mut session) = self.session.take() else {
            return false;
        };
        let session_id = session.id;
        session.chunks.clear();
        session.shut_down();
        self.transition(RecordingState::Idle);

        tracing::info!(session_id = %session_id, "Recording cancelled");
        self.emit(SessionEvent::RecordingCancelled {
            session_id,
            timestamp: Timestamp::now(),
        });
        true
    }

    /// Return to `Idle` once the transcription handoff completed.
    pub fn finish(&mut self) {
        if self.state == RecordingState::Finalizing {
            self.transition(RecordingState::Idle);
        }
    }
}

impl<M: MicrophoneDevice> Drop for RecordingController<M> {
    fn drop(&mut self) {
        if let Some((_, task)) = self.pending.take() {
            task.abort();
        }
        if let Some(session) = self.session.take() {
            session.shut_down();
        }
    }
}

/// Render elapsed recording time as `MM:SS`.
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
