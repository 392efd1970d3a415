//! Playback handle state machine and the observable playback state

use serde::{Deserialize, Serialize};

use super::PlaybackError;

/// Lifecycle of a single playback handle
///
/// ```text
/// idle → loading → ready → playing ⇄ paused → ended
///            ↘        ↘        ↘        ↙
///                      error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HandleState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

impl HandleState {
    pub fn can_transition_to(self, next: HandleState) -> bool {
        use HandleState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Ready)
                | (Loading, Error)
                | (Ready, Playing)
                | (Ready, Error)
                | (Playing, Paused)
                | (Playing, Ended)
                | (Playing, Error)
                | (Paused, Playing)
                | (Paused, Ended)
                // a paused stream can still fail to buffer
                | (Paused, Error)
                // replay after the clip finished
                | (Ended, Playing)
                // stop
                | (Loading, Idle)
                | (Ready, Idle)
                | (Playing, Idle)
                | (Paused, Idle)
                | (Ended, Idle)
                | (Error, Idle)
        )
    }

    /// The handle can be (re)started without loading again
    pub fn is_resumable(self) -> bool {
        matches!(self, HandleState::Ready | HandleState::Paused | HandleState::Ended)
    }
}

/// What the floating mini-player shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalPlayerInfo {
    pub article_id: String,
    pub article_number: String,
    pub code_id: String,
    pub audio_url: String,
}

/// Request to play the audio commentary of an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    pub article_id: String,
    pub article_number: String,
    pub code_id: String,
    pub audio_url: String,
}

impl PlayRequest {
    pub fn new(
        code_id: impl Into<String>,
        article_id: impl Into<String>,
        article_number: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self {
            code_id: code_id.into(),
            article_id: article_id.into(),
            article_number: article_number.into(),
            audio_url: audio_url.into(),
        }
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.article_id.trim().is_empty() {
            return Err(PlaybackError::InvalidArticle);
        }
        if self.audio_url.trim().is_empty() {
            return Err(PlaybackError::MissingAudio(self.article_id.clone()));
        }
        Ok(())
    }

    pub(crate) fn player_info(&self) -> MinimalPlayerInfo {
        MinimalPlayerInfo {
            article_id: self.article_id.clone(),
            article_number: self.article_number.clone(),
            code_id: self.code_id.clone(),
            audio_url: self.audio_url.clone(),
        }
    }
}

/// Read-only view of the now-playing slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub current_audio_id: Option<String>,
    pub is_playing: bool,
    pub state: HandleState,
    pub player_info: Option<MinimalPlayerInfo>,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    /// Message of the last failure, cleared by the next successful start
    pub last_error: Option<String>,
}
