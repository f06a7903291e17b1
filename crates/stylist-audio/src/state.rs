//! Recording state machine.
//!
//! Valid transitions for one capture session:
//! - Idle -> AwaitingPermission (start requested)
//! - AwaitingPermission -> Recording (access granted)
//! - AwaitingPermission -> Idle (access denied or device failure)
//! - Recording -> Finalizing (stopped, manually or by the deadline)
//! - Recording -> Idle (cancelled, audio discarded)
//! - Finalizing -> Idle (transcription handoff finished)

use std::fmt;

use stylist_core::error::StylistError;

/// Lifecycle state of the recording controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RecordingState {
    /// No capture in progress. The only state `start()` acts in.
    #[default]
    Idle,
    /// Waiting for the user to grant microphone access.
    AwaitingPermission,
    /// Capturing fragments. The device lease is held.
    Recording,
    /// Capture ended and the clip is being handed to transcription.
    Finalizing,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingState::Idle => write!(f, "Idle"),
            RecordingState::AwaitingPermission => write!(f, "AwaitingPermission"),
            RecordingState::Recording => write!(f, "Recording"),
            RecordingState::Finalizing => write!(f, "Finalizing"),
        }
    }
}

impl RecordingState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &RecordingState) -> bool {
        matches!(
            (self, target),
            (RecordingState::Idle, RecordingState::AwaitingPermission)
                | (RecordingState::AwaitingPermission, RecordingState::Recording)
                | (RecordingState::Recording, RecordingState::Finalizing)
                | (RecordingState::Finalizing, RecordingState::Idle)
                // Error and cancel paths
                | (RecordingState::AwaitingPermission, RecordingState::Idle)
                | (RecordingState::Recording, RecordingState::Idle)
        )
    }

    /// Validate a transition, describing the rejected pair on failure.
    pub fn check_transition(&self, target: RecordingState) -> Result<(), StylistError> {
        if self.can_transition_to(&target) {
            Ok(())
        } else {
            Err(StylistError::Device(format!(
                "Invalid recording transition: {} -> {}",
                self, target
            )))
        }
    }
}
