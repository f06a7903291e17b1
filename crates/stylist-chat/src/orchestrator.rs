//! Session orchestrator: the single owner of conversation state.
//!
//! Commands arrive either as direct method calls or through a
//! [`SessionHandle`]. Network round trips, the permission prompt and timers
//! run on spawned tasks and report back through channels; `step` applies
//! exactly one such message at a time, so every state change happens on
//! the orchestrator's own task and in arrival order.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use stylist_audio::{
    AudioSink, MicrophoneDevice, PlaybackController, RecorderSignal, RecorderUpdate,
    RecordingController, RecordingState, StopOutcome,
};
use stylist_client::StylistBackend;
use stylist_core::catalog::OutfitSummary;
use stylist_core::config::StylistConfig;
use stylist_core::error::{Result, StylistError};
use stylist_core::events::SessionEvent;
use stylist_core::types::{
    ConnectionStatus, ConversationTurn, HealthStatus, ImageAttachment, MessageKind, Notice,
    NoticeLevel, RenderedMessage, Timestamp,
};

use crate::gateway::{ChatGateway, ChatReply};
use crate::session::{Inbox, SessionCommand, SessionHandle, SessionState};
use crate::transcription::TranscriptionGateway;

/// Capacity of the event broadcast. Slow subscribers lag rather than block.
const EVENT_CAPACITY: usize = 256;

/// Mime type of synthesized replies.
const REPLY_AUDIO_MIME: &str = "audio/mpeg";

const BUSY_NOTICE: &str = "Please wait for the current request to complete";
const OFFLINE_NOTICE: &str = "Cannot connect to backend. Please ensure server is running.";
const PERMISSION_NOTICE: &str =
    "Microphone access denied. Please allow microphone access to use voice input.";

/// Coordinates chat, recording, transcription and playback for one session.
pub struct SessionOrchestrator<B, M, S>
where
    B: StylistBackend + 'static,
    M: MicrophoneDevice,
    S: AudioSink,
{
    state: SessionState,
    config: StylistConfig,
    backend: Arc<B>,
    chat: ChatGateway<B>,
    transcription: TranscriptionGateway<B>,
    recorder: RecordingController<M>,
    playback: PlaybackController<S>,
    events: broadcast::Sender<SessionEvent>,
    inbox_tx: mpsc::UnboundedSender<Inbox>,
    inbox_rx: mpsc::UnboundedReceiver<Inbox>,
    recorder_rx: mpsc::UnboundedReceiver<RecorderSignal>,
    health_in_flight: bool,
    shut_down: bool,
}

impl<B, M, S> SessionOrchestrator<B, M, S>
where
    B: StylistBackend + 'static,
    M: MicrophoneDevice,
    S: AudioSink,
{
    /// Build a session and render the welcome message.
    pub fn new(config: StylistConfig, backend: Arc<B>, mic: Arc<M>, sink: Arc<S>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (recorder_tx, recorder_rx) = mpsc::unbounded_channel();

        let timeout = config.backend.request_timeout();
        let chat = ChatGateway::new(Arc::clone(&backend), config.chat.clone(), timeout);
        let transcription = TranscriptionGateway::new(Arc::clone(&backend), timeout);
        let recorder =
            RecordingController::new(mic, config.recording.clone(), recorder_tx, events.clone());
        let playback = PlaybackController::new(sink);

        let mut orchestrator = Self {
            state: SessionState::default(),
            config,
            backend,
            chat,
            transcription,
            recorder,
            playback,
            events,
            inbox_tx,
            inbox_rx,
            recorder_rx,
            health_in_flight: false,
            shut_down: false,
        };
        let welcome = orchestrator.config.chat.welcome_message.clone();
        orchestrator.render(MessageKind::Welcome, welcome, None);
        orchestrator
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.inbox_tx.clone(),
        }
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn outfit_summary(&self) -> OutfitSummary {
        OutfitSummary::from_items(&self.state.recommendations)
    }

    // =========================================================================
    // Driving
    // =========================================================================

    /// Wait for and apply one message: a command, a task completion or a
    /// recorder signal. Returns `false` once the session has shut down.
    pub async fn step(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        tokio::select! {
            Some(message) = self.inbox_rx.recv() => self.handle_inbox(message),
            Some(signal) = self.recorder_rx.recv() => self.handle_recorder_signal(signal),
            else => return false,
        }
        !self.shut_down
    }

    /// Step until shutdown.
    pub async fn run(mut self) {
        while self.step().await {}
        tracing::info!("Session ended");
    }

    fn handle_inbox(&mut self, message: Inbox) {
        match message {
            Inbox::Command(command) => self.execute(command),
            Inbox::ChatFinished(result) => self.on_chat_finished(result),
            Inbox::TranscriptionFinished(result) => self.on_transcription_finished(result),
            Inbox::HealthChecked(result) => self.on_health_checked(result),
            Inbox::AutoSend => self.on_auto_send(),
        }
    }

    /// Apply a command. Failures have already been surfaced as notices.
    pub fn execute(&mut self, command: SessionCommand) {
        tracing::debug!(?command, "Session command");
        match command {
            SessionCommand::Submit { text, image } => {
                let _ = self.submit(&text, image);
            }
            SessionCommand::SetInput(text) => self.set_input(text),
            SessionCommand::SendInput => {
                let _ = self.send_input();
            }
            SessionCommand::AttachImage(image) => {
                let _ = self.attach_image(image);
            }
            SessionCommand::ClearImage => self.clear_image(),
            SessionCommand::StartRecording => {
                self.start_recording();
            }
            SessionCommand::StopRecording => self.stop_recording(),
            SessionCommand::CancelRecording => self.cancel_recording(),
            SessionCommand::ClearRecommendations => self.clear_recommendations(),
            SessionCommand::CheckConnection => self.check_connection(),
            SessionCommand::Shutdown => self.shutdown(),
        }
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Send a user turn.
    ///
    /// Rejected submissions make no network call and leave the input and
    /// pending image as they were. Accepted ones are rendered and appended
    /// to history before the request goes out.
    pub fn submit(&mut self, text: &str, image: Option<ImageAttachment>) -> Result<()> {
        let prepared = match self.chat.prepare(
            text,
            image,
            &self.state.history,
            self.state.processing,
            self.state.connection,
        ) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::debug!(error = %e, "Submission rejected");
                self.notify_error(&e);
                return Err(e);
            }
        };

        let turn = prepared.turn;
        self.render(
            MessageKind::User,
            turn.content.clone(),
            turn.attached_image.clone(),
        );
        let had_image = turn.attached_image.is_some();
        let sent_pending = had_image && turn.attached_image == self.state.pending_image;
        self.state.history.push(turn);

        if !self.state.input.is_empty() {
            self.state.input.clear();
            self.emit(SessionEvent::InputChanged {
                text: String::new(),
            });
        }
        // A different image sent explicitly leaves the pending one in place.
        if sent_pending {
            self.state.pending_image = None;
            self.emit(SessionEvent::PendingImageChanged { attached: false });
        }
        self.set_processing(true);

        let chat = self.chat.clone();
        let tx = self.inbox_tx.clone();
        let request = prepared.request;
        tracing::info!(
            history_len = request.conversation_history.len(),
            has_image = had_image,
            "Dispatching chat request"
        );
        tokio::spawn(async move {
            let result = chat.send(request).await;
            let _ = tx.send(Inbox::ChatFinished(result));
        });
        Ok(())
    }

    fn on_chat_finished(&mut self, result: Result<ChatReply>) {
        match result {
            Ok(reply) => {
                self.state
                    .history
                    .push(ConversationTurn::assistant(reply.text.clone()));
                self.render(MessageKind::Assistant, reply.text, None);

                if let Some(context) = reply.event_context {
                    self.state.event_context = Some(context.clone());
                    self.emit(SessionEvent::EventContextUpdated { context });
                }
                if let Some(items) = reply.items {
                    tracing::info!(count = items.len(), "Recommendations updated");
                    self.state.recommendations = items.clone();
                    self.emit(SessionEvent::RecommendationsUpdated { items });
                }
                if let Some(audio) = reply.audio_base64.filter(|_| self.config.chat.return_audio) {
                    if let Some(byte_count) = self.playback.play_encoded(&audio, REPLY_AUDIO_MIME) {
                        self.emit(SessionEvent::PlaybackStarted { byte_count });
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chat request failed");
                let apology = self.config.chat.apology_message.clone();
                self.render(MessageKind::Apology, apology, None);
                self.notice(NoticeLevel::Error, format!("Error: {}", e));
                if e.is_connectivity() {
                    self.set_connection(ConnectionStatus::Offline, None);
                }
            }
        }
        self.set_processing(false);
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.input = text.into();
        self.emit(SessionEvent::InputChanged {
            text: self.state.input.clone(),
        });
    }

    /// Submit the current input with the pending image.
    pub fn send_input(&mut self) -> Result<()> {
        let text = self.state.input.clone();
        let image = self.state.pending_image.clone();
        self.submit(&text, image)
    }

    /// Attach an image to the next turn, replacing any pending one.
    ///
    /// Bytes that are not a supported image are rejected with a notice and
    /// the pending image is left as it was.
    pub fn attach_image(&mut self, image: ImageAttachment) -> Result<()> {
        if let Err(e) = image.validate() {
            tracing::debug!(bytes = image.len(), "Attachment rejected: not an image");
            self.notify_error(&e);
            return Err(e);
        }
        tracing::debug!(bytes = image.len(), mime_type = image.mime_type(), "Image attached");
        self.state.pending_image = Some(image);
        self.emit(SessionEvent::PendingImageChanged { attached: true });
        Ok(())
    }

    pub fn clear_image(&mut self) {
        if self.state.pending_image.take().is_some() {
            self.emit(SessionEvent::PendingImageChanged { attached: false });
        }
    }

    pub fn clear_recommendations(&mut self) {
        self.state.recommendations.clear();
        self.state.event_context = None;
        self.emit(SessionEvent::RecommendationsCleared);
    }

    // =========================================================================
    // Voice
    // =========================================================================

    /// Begin recording. A no-op returning the current state unless idle.
    pub fn start_recording(&mut self) -> RecordingState {
        self.recorder.start()
    }

    pub fn stop_recording(&mut self) {
        if let Some(outcome) = self.recorder.stop() {
            self.on_recording_stopped(outcome);
        }
    }

    pub fn cancel_recording(&mut self) {
        if self.recorder.cancel() {
            self.notice(NoticeLevel::Info, "Recording cancelled");
        }
    }

    fn handle_recorder_signal(&mut self, signal: RecorderSignal) {
        match self.recorder.handle_signal(signal) {
            RecorderUpdate::Failed(StylistError::Permission(_)) => {
                self.notice(NoticeLevel::Error, PERMISSION_NOTICE);
            }
            RecorderUpdate::Failed(e) => {
                self.notice(NoticeLevel::Error, format!("Microphone error: {}", e));
            }
            RecorderUpdate::TimedOut(outcome) => {
                self.notice(
                    NoticeLevel::Info,
                    format!(
                        "Maximum recording time reached ({}s)",
                        self.config.recording.max_duration_secs
                    ),
                );
                self.on_recording_stopped(outcome);
            }
            RecorderUpdate::Ignored
            | RecorderUpdate::Started { .. }
            | RecorderUpdate::Buffered { .. }
            | RecorderUpdate::Tick { .. } => {}
        }
    }

    fn on_recording_stopped(&mut self, outcome: StopOutcome) {
        match outcome {
            StopOutcome::Empty { .. } => {
                self.notice(NoticeLevel::Warning, "No audio recorded");
            }
            StopOutcome::Finalized { session_id, clip } => {
                tracing::info!(session_id = %session_id, bytes = clip.len(), "Sending recording for transcription");
                let gateway = self.transcription.clone();
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = gateway.transcribe(clip).await;
                    let _ = tx.send(Inbox::TranscriptionFinished(result));
                });
            }
        }
    }

    fn on_transcription_finished(&mut self, result: Result<String>) {
        self.recorder.finish();
        match result {
            Ok(transcript) => {
                self.emit(SessionEvent::TranscriptReady {
                    text: transcript.clone(),
                });
                self.set_input(transcript);
                self.notice(NoticeLevel::Success, "Voice transcribed successfully!");

                let delay = self.config.chat.auto_send_delay();
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Inbox::AutoSend);
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Transcription failed");
                self.notice(NoticeLevel::Error, format!("Transcription failed: {}", e));
            }
        }
    }

    /// The delayed send after a transcript. Dropped, not queued, while a
    /// chat request is in flight.
    fn on_auto_send(&mut self) {
        if self.state.processing {
            tracing::info!("Auto-send dropped: request in flight");
            self.notice(
                NoticeLevel::Warning,
                "Voice message not sent automatically: a request is already in progress",
            );
            return;
        }
        let _ = self.send_input();
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Ask the backend for its health. Ignored while a check is in flight.
    pub fn check_connection(&mut self) {
        if self.health_in_flight {
            return;
        }
        self.health_in_flight = true;

        let backend = Arc::clone(&self.backend);
        let timeout = self.config.backend.request_timeout();
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, backend.health()).await {
                Ok(result) => result,
                Err(_) => Err(StylistError::Connectivity(
                    "health check timed out".to_string(),
                )),
            };
            let _ = tx.send(Inbox::HealthChecked(result));
        });
    }

    fn on_health_checked(&mut self, result: Result<HealthStatus>) {
        self.health_in_flight = false;
        let was = self.state.connection;
        match result {
            Ok(health) if health.is_healthy() => {
                self.state.demo_mode = health.demo_mode;
                self.set_connection(ConnectionStatus::Online, Some(health.dataset_size));
                if was != ConnectionStatus::Online {
                    tracing::info!(dataset_size = health.dataset_size, "Connected to backend");
                    if health.demo_mode {
                        self.notice(NoticeLevel::Info, "Demo mode is active");
                    }
                }
            }
            other => {
                match other {
                    Ok(health) => tracing::warn!(status = %health.status, "Backend not healthy"),
                    Err(e) => tracing::warn!(error = %e, "Health check failed"),
                }
                self.set_connection(ConnectionStatus::Offline, None);
                if was != ConnectionStatus::Offline {
                    self.notice(NoticeLevel::Error, OFFLINE_NOTICE);
                }
            }
        }
    }

    fn set_connection(&mut self, status: ConnectionStatus, dataset_size: Option<u64>) {
        let changed = self.state.connection != status || self.state.dataset_size != dataset_size;
        self.state.connection = status;
        self.state.dataset_size = dataset_size;
        if status != ConnectionStatus::Online {
            self.state.demo_mode = false;
        }
        if changed {
            self.emit(SessionEvent::ConnectionChanged {
                status,
                dataset_size,
                demo_mode: self.state.demo_mode,
            });
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Abandon any recording and playback and stop stepping.
    pub fn shutdown(&mut self) {
        self.recorder.cancel();
        self.playback.stop();
        self.shut_down = true;
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn render(&mut self, kind: MessageKind, text: String, image: Option<ImageAttachment>) {
        self.emit(SessionEvent::MessageRendered {
            kind,
            text: text.clone(),
            has_image: image.is_some(),
            timestamp: Timestamp::now(),
        });
        self.state.view.push(RenderedMessage { kind, text, image });
    }

    fn set_processing(&mut self, processing: bool) {
        if self.state.processing != processing {
            self.state.processing = processing;
            self.emit(SessionEvent::ProcessingChanged { processing });
        }
    }

    fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(SessionEvent::Notice(Notice::new(level, message)));
    }

    fn notify_error(&self, error: &StylistError) {
        match error {
            StylistError::Validation(msg) => self.notice(NoticeLevel::Warning, msg.clone()),
            StylistError::Busy => self.notice(NoticeLevel::Warning, BUSY_NOTICE),
            StylistError::Connectivity(msg) => self.notice(NoticeLevel::Error, msg.clone()),
            other => self.notice(NoticeLevel::Error, other.to_string()),
        }
    }
}
