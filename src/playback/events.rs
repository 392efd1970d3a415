//! Notifications published by the playback coordinator
//!
//! Events serialize as internally tagged JSON, e.g.
//! `{"type": "nowPlaying", "articleId": "art5", "articleNumber": "5º", "audioUrl": "..."}`.
//! Payloads coming from outside the process go through
//! [`PlaybackEvent::from_json`], which rejects events without an article id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingEvent {
    pub article_id: String,
    #[serde(default)]
    pub article_number: String,
    pub audio_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioEndedEvent {
    pub article_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioPausedEvent {
    pub article_id: String,
}

/// User-facing notice that playback could not start or was interrupted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackFailedEvent {
    pub article_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    NowPlaying(NowPlayingEvent),
    AudioEnded(AudioEndedEvent),
    AudioPaused(AudioPausedEvent),
    PlaybackFailed(PlaybackFailedEvent),
}

impl PlaybackEvent {
    pub fn article_id(&self) -> &str {
        match self {
            PlaybackEvent::NowPlaying(e) => &e.article_id,
            PlaybackEvent::AudioEnded(e) => &e.article_id,
            PlaybackEvent::AudioPaused(e) => &e.article_id,
            PlaybackEvent::PlaybackFailed(e) => &e.article_id,
        }
    }

    /// Decode and validate an event payload
    pub fn from_json(payload: &str) -> Result<Self, EventError> {
        let event: PlaybackEvent = serde_json::from_str(payload)?;
        event.validate()?;
        Ok(event)
    }

    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), EventError> {
        if self.article_id().trim().is_empty() {
            return Err(EventError::MissingField("articleId"));
        }
        if let PlaybackEvent::NowPlaying(e) = self {
            if e.audio_url.trim().is_empty() {
                return Err(EventError::MissingField("audioUrl"));
            }
        }
        Ok(())
    }
}
