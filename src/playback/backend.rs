//! Platform seam for audio output
//!
//! The coordinator never decodes audio itself. A backend wraps whatever
//! actually plays sound (a media element, a native player) and reports
//! lifecycle changes back through
//! [`PlaybackCoordinator::handle_media_event`](super::PlaybackCoordinator::handle_media_event).

use thiserror::Error;

/// Identifier the coordinator assigns to each playback handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Autoplay policy or missing user gesture
    #[error("Playback blocked: {0}")]
    Blocked(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not decode audio: {0}")]
    Decode(String),
}

/// Lifecycle callbacks from the backend
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration_secs: f64 },
    Play,
    Pause,
    TimeUpdate { position_secs: f64 },
    Ended,
    Error { message: String },
}

/// Audio output driven by the coordinator
///
/// Methods are called while the coordinator's state is locked. Implementations
/// may still report media events from inside them; those events are applied
/// after the call that triggered them.
pub trait AudioBackend: Send + Sync {
    /// Prepare `handle` to play `audio_url`
    fn load(&self, handle: HandleId, audio_url: &str) -> Result<(), BackendError>;

    /// Start or resume playback. May be rejected.
    fn play(&self, handle: HandleId) -> Result<(), BackendError>;

    fn pause(&self, handle: HandleId);

    /// Free everything held for `handle`. Called once per handle.
    fn release(&self, handle: HandleId);
}
