//! Storage port shared by the local and remote note stores

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Annotation, Comment};
use crate::article::ArticleRef;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Invalid backend configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid note: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, NoteError>;

/// Persistence for annotations and comments
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Annotations on one article, oldest first
    async fn list_annotations(&self, article: &ArticleRef) -> Result<Vec<Annotation>>;

    /// Every annotation in the store
    async fn list_all_annotations(&self) -> Result<Vec<Annotation>>;

    /// Insert or replace by id
    async fn save_annotation(&self, annotation: &Annotation) -> Result<()>;

    async fn delete_annotation(&self, id: Uuid) -> Result<()>;

    /// Comments on one article, newest first
    async fn list_comments(&self, article: &ArticleRef) -> Result<Vec<Comment>>;

    /// Every comment in the store, oldest first
    async fn list_all_comments(&self) -> Result<Vec<Comment>>;

    /// Insert or replace by id
    async fn add_comment(&self, comment: &Comment) -> Result<()>;

    async fn delete_comment(&self, id: Uuid) -> Result<()>;
}
