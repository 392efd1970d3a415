//! Audio commentary playback
//!
//! A single [`PlaybackCoordinator`] guarantees that only one article's audio
//! plays at a time, however many player components (inline article players,
//! the playlist, the floating mini-player) are mounted. Components observe the
//! now-playing slot through subscriptions instead of polling it.

pub mod backend;
pub mod coordinator;
pub mod events;
pub mod state;

use thiserror::Error;

pub use backend::{AudioBackend, BackendError, HandleId, MediaEvent};
pub use coordinator::{Listener, PlaybackCoordinator, SubscriberId, Subscription};
pub use events::{
    AudioEndedEvent, AudioPausedEvent, EventError, NowPlayingEvent, PlaybackEvent, PlaybackFailedEvent,
};
pub use state::{HandleState, MinimalPlayerInfo, PlayRequest, PlaybackSnapshot};

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Article id is required")]
    InvalidArticle,

    #[error("No audio available for article {0}")]
    MissingAudio(String),

    #[error("No audio is loaded")]
    NoActiveAudio,

    #[error(transparent)]
    Backend(#[from] BackendError),
}
