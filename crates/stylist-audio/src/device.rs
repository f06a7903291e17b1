//! Microphone device seam.
//!
//! A device grants access by returning a [`DeviceLease`]. While the lease is
//! held the device pushes captured fragments into a [`FragmentSink`]; the
//! lease is released exactly once, explicitly or on drop.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use stylist_core::error::StylistError;
use stylist_core::types::CaptureFormat;

use crate::recorder::RecorderSignal;

// =============================================================================
// Traits
// =============================================================================

/// An audio input device that requires user permission before capturing.
pub trait MicrophoneDevice: Send + Sync + 'static {
    /// Whether the device can encode in `format`.
    fn supports(&self, format: CaptureFormat) -> bool;

    /// Ask for access and start capturing into `sink`.
    ///
    /// Suspends while the user decides. Denial yields
    /// `StylistError::Permission`; hardware failures yield
    /// `StylistError::Device`. No lease is held on either error path.
    fn request_access(
        &self,
        format: CaptureFormat,
        sink: FragmentSink,
    ) -> impl Future<Output = Result<DeviceLease, StylistError>> + Send;
}

// =============================================================================
// Lease and sink
// =============================================================================

/// Exclusive handle on an open capture device.
pub struct DeviceLease {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl DeviceLease {
    /// Wrap the device's release routine.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Stop capturing and give the device back.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for DeviceLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLease")
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// Where a device delivers captured fragments for one recording session.
#[derive(Debug, Clone)]
pub struct FragmentSink {
    session_id: Uuid,
    tx: mpsc::UnboundedSender<RecorderSignal>,
}

impl FragmentSink {
    pub fn new(session_id: Uuid, tx: mpsc::UnboundedSender<RecorderSignal>) -> Self {
        Self { session_id, tx }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Deliver one fragment. Returns `false` once the controller is gone.
    pub fn push(&self, bytes: Vec<u8>) -> bool {
        self.tx
            .send(RecorderSignal::Fragment {
                session_id: self.session_id,
                bytes,
            })
            .is_ok()
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

#[derive(Debug)]
struct MockMicState {
    grant: bool,
    supports_webm: bool,
    permission_delay: Duration,
    access_requests: usize,
    active_leases: usize,
    total_leases: usize,
    formats: Vec<CaptureFormat>,
    sink: Option<FragmentSink>,
}

/// Mock microphone for testing.
///
/// Grants access by default and counts leases so tests can assert that no
/// handle leaks. Fragments are injected with [`MockMicrophone::emit`].
#[derive(Debug, Clone)]
pub struct MockMicrophone {
    state: Arc<Mutex<MockMicState>>,
}

impl Default for MockMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMicrophone {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockMicState {
                grant: true,
                supports_webm: true,
                permission_delay: Duration::ZERO,
                access_requests: 0,
                active_leases: 0,
                total_leases: 0,
                formats: Vec::new(),
                sink: None,
            })),
        }
    }

    /// A microphone whose permission prompt is always declined.
    pub fn denying() -> Self {
        let mic = Self::new();
        mic.lock().grant = false;
        mic
    }

    fn lock(&self) -> MutexGuard<'_, MockMicState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_supports_webm(&self, supported: bool) {
        self.lock().supports_webm = supported;
    }

    /// How long the simulated permission prompt stays open.
    pub fn set_permission_delay(&self, delay: Duration) {
        self.lock().permission_delay = delay;
    }

    /// Push a fragment through the most recently opened sink.
    ///
    /// Still delivers after the lease is released, which lets tests
    /// simulate fragments arriving late.
    pub fn emit(&self, bytes: impl Into<Vec<u8>>) -> bool {
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => sink.push(bytes.into()),
            None => false,
        }
    }

    pub fn access_requests(&self) -> usize {
        self.lock().access_requests
    }

    pub fn active_leases(&self) -> usize {
        self.lock().active_leases
    }

    pub fn total_leases(&self) -> usize {
        self.lock().total_leases
    }

    /// Formats requested so far, in order.
    pub fn requested_formats(&self) -> Vec<CaptureFormat> {
        self.lock().formats.clone()
    }
}

impl MicrophoneDevice for MockMicrophone {
    fn supports(&self, format: CaptureFormat) -> bool {
        match format {
            CaptureFormat::Webm => self.lock().supports_webm,
            CaptureFormat::Mp4 => true,
        }
    }

    async fn request_access(
        &self,
        format: CaptureFormat,
        sink: FragmentSink,
    ) -> Result<DeviceLease, StylistError> {
        let delay = {
            let mut state = self.lock();
            state.access_requests += 1;
            state.formats.push(format);
            state.permission_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if !state.grant {
            return Err(StylistError::Permission(
                "Microphone access denied".to_string(),
            ));
        }
        state.active_leases += 1;
        state.total_leases += 1;
        state.sink = Some(sink);
        drop(state);

        let shared = Arc::clone(&self.state);
        Ok(DeviceLease::new(move || {
            let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
            state.active_leases = state.active_leases.saturating_sub(1);
        }))
    }
}
