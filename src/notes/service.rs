//! Annotation and comment service with offline fallback
//!
//! When the user is signed in, notes go to the backend. Any backend failure on
//! a write keeps the note on this device and reports [`SaveOutcome::SavedLocally`]
//! so the UI can tell the user; reads fall back to local notes the same way.
//!
//! Notes kept on this device stay visible next to the backend's until
//! [`NoteService::migrate_local_to_remote`] uploads them.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use super::local::LocalNoteStore;
use super::models::{Annotation, Comment, SaveOutcome};
use super::remote::RemoteNoteStore;
use super::store::{NoteError, NoteStore, Result};
use crate::article::ArticleRef;
use crate::config::AppConfig;

pub struct NoteService {
    local: Arc<dyn NoteStore>,
    remote: Option<Arc<dyn NoteStore>>,
}

impl NoteService {
    pub fn new(local: Arc<dyn NoteStore>, remote: Option<Arc<dyn NoteStore>>) -> Self {
        Self { local, remote }
    }

    /// Local store under `data_dir`, plus the backend when the config holds a session
    pub fn from_config(config: &AppConfig, data_dir: PathBuf) -> Self {
        let local: Arc<dyn NoteStore> = Arc::new(LocalNoteStore::new(data_dir));

        let remote: Option<Arc<dyn NoteStore>> = if config.backend.is_authenticated() {
            match RemoteNoteStore::new(&config.backend) {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    log::warn!("Backend unavailable, keeping notes on this device: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self::new(local, remote)
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    fn validate(article: &ArticleRef, content: &str) -> Result<()> {
        if !article.is_valid() {
            return Err(NoteError::Invalid("article id is required".to_string()));
        }
        if content.trim().is_empty() {
            return Err(NoteError::Invalid("content is empty".to_string()));
        }
        Ok(())
    }

    pub async fn annotations(&self, article: &ArticleRef) -> Result<Vec<Annotation>> {
        let local = self.local.list_annotations(article).await?;
        let Some(remote) = &self.remote else {
            return Ok(local);
        };

        match remote.list_annotations(article).await {
            Ok(mut annotations) => {
                for annotation in local {
                    match annotations.iter_mut().find(|a| a.id == annotation.id) {
                        // an edit made during an outage is newer than the backend row
                        Some(existing) if annotation.updated_at > existing.updated_at => {
                            *existing = annotation
                        }
                        Some(_) => {}
                        None => annotations.push(annotation),
                    }
                }
                annotations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                Ok(annotations)
            }
            Err(e) => {
                log::warn!("Loading annotations from {} failed: {}", remote.name(), e);
                Ok(local)
            }
        }
    }

    async fn store_annotation(&self, annotation: &Annotation) -> Result<SaveOutcome> {
        if let Some(remote) = &self.remote {
            match remote.save_annotation(annotation).await {
                Ok(()) => return Ok(SaveOutcome::Saved),
                Err(e) => {
                    log::warn!("Saving annotation {} to {} failed: {}", annotation.id, remote.name(), e);
                    self.local.save_annotation(annotation).await?;
                    return Ok(SaveOutcome::SavedLocally);
                }
            }
        }
        self.local.save_annotation(annotation).await?;
        Ok(SaveOutcome::Saved)
    }

    pub async fn add_annotation(
        &self,
        article: &ArticleRef,
        content: &str,
    ) -> Result<(Annotation, SaveOutcome)> {
        Self::validate(article, content)?;
        let annotation = Annotation::new(article.clone(), content.trim().to_string());
        let outcome = self.store_annotation(&annotation).await?;
        log::debug!("Added annotation {} on {}", annotation.id, article.article_id);
        Ok((annotation, outcome))
    }

    pub async fn update_annotation(
        &self,
        mut annotation: Annotation,
        content: &str,
    ) -> Result<(Annotation, SaveOutcome)> {
        Self::validate(&annotation.article, content)?;
        annotation.content = content.trim().to_string();
        annotation.updated_at = chrono::Utc::now();
        let outcome = self.store_annotation(&annotation).await?;
        Ok((annotation, outcome))
    }

    /// Remove an annotation everywhere it may live
    ///
    /// Backend errors propagate. `NotFound` only when neither store held it.
    pub async fn delete_annotation(&self, id: Uuid) -> Result<()> {
        let Some(remote) = &self.remote else {
            return self.local.delete_annotation(id).await;
        };
        let on_remote = found(remote.delete_annotation(id).await)?;
        let on_device = found(self.local.delete_annotation(id).await)?;
        if on_remote || on_device {
            Ok(())
        } else {
            Err(NoteError::NotFound(id))
        }
    }

    /// Comments on an article, newest first
    pub async fn comments(&self, article: &ArticleRef) -> Result<Vec<Comment>> {
        let local = self.local.list_comments(article).await?;
        let Some(remote) = &self.remote else {
            return Ok(local);
        };

        match remote.list_comments(article).await {
            Ok(mut comments) => {
                for comment in local {
                    if !comments.iter().any(|c| c.id == comment.id) {
                        comments.push(comment);
                    }
                }
                comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(comments)
            }
            Err(e) => {
                log::warn!("Loading comments from {} failed: {}", remote.name(), e);
                Ok(local)
            }
        }
    }

    pub async fn add_comment(
        &self,
        article: &ArticleRef,
        author_id: &str,
        author_name: &str,
        content: &str,
    ) -> Result<(Comment, SaveOutcome)> {
        Self::validate(article, content)?;
        let comment = Comment::new(
            article.clone(),
            author_id.to_string(),
            author_name.to_string(),
            content.trim().to_string(),
        );

        if let Some(remote) = &self.remote {
            match remote.add_comment(&comment).await {
                Ok(()) => return Ok((comment, SaveOutcome::Saved)),
                Err(e) => {
                    log::warn!("Posting comment to {} failed: {}", remote.name(), e);
                    self.local.add_comment(&comment).await?;
                    return Ok((comment, SaveOutcome::SavedLocally));
                }
            }
        }
        self.local.add_comment(&comment).await?;
        Ok((comment, SaveOutcome::Saved))
    }

    /// Same rules as [`NoteService::delete_annotation`]
    pub async fn delete_comment(&self, id: Uuid) -> Result<()> {
        let Some(remote) = &self.remote else {
            return self.local.delete_comment(id).await;
        };
        let on_remote = found(remote.delete_comment(id).await)?;
        let on_device = found(self.local.delete_comment(id).await)?;
        if on_remote || on_device {
            Ok(())
        } else {
            Err(NoteError::NotFound(id))
        }
    }

    /// Upload every local annotation and comment to the backend, then drop
    /// the local copies
    ///
    /// Returns how many notes moved. Stops at the first failed upload,
    /// leaving that note and the rest on this device.
    pub async fn migrate_local_to_remote(&self) -> Result<usize> {
        let remote = self.remote.as_ref().ok_or(NoteError::NotAuthenticated)?;
        let annotations = self.local.list_all_annotations().await?;
        let comments = self.local.list_all_comments().await?;

        let mut migrated = 0;
        for annotation in &annotations {
            remote.save_annotation(annotation).await?;
            self.local.delete_annotation(annotation.id).await?;
            migrated += 1;
        }
        for comment in &comments {
            remote.add_comment(comment).await?;
            self.local.delete_comment(comment.id).await?;
            migrated += 1;
        }

        if migrated > 0 {
            log::info!(
                "Migrated {} annotations and {} comments to {}",
                annotations.len(),
                comments.len(),
                remote.name()
            );
        }
        Ok(migrated)
    }
}

/// `Ok(false)` for a store that never held the note
fn found(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(NoteError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
