//! Stylist Audio crate - microphone capture sessions and reply playback.
//!
//! Provides the microphone device seam with its exclusive lease, the
//! recording state machine, the `RecordingController` that drives one
//! capture session at a time, and the `PlaybackController` that keeps at
//! most one synthesized reply playing. Mock devices are included for
//! testing without audio hardware.

pub mod device;
pub mod playback;
pub mod recorder;
pub mod state;

pub use device::{DeviceLease, FragmentSink, MicrophoneDevice, MockMicrophone};
pub use playback::{AudioSink, MockAudioSink, PlaybackController};
pub use recorder::{format_elapsed, RecorderSignal, RecorderUpdate, RecordingController, StopOutcome};
pub use state::RecordingState;
