//! Annotation and comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::ArticleRef;

/// Private note a user attaches to an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: Uuid,
    pub article: ArticleRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Annotation {
    pub fn new(article: ArticleRef, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            article,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Community comment on an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub article: ArticleRef,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(article: ArticleRef, author_id: String, author_name: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            article,
            author_id,
            author_name,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Where a write ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveOutcome {
    /// Written to the active store
    Saved,
    /// The backend failed and the note was kept on this device instead
    SavedLocally,
}
