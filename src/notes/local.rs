//! Note store backed by JSON files on this device
//!
//! ```text
//! {data_dir}/notes/
//! ├── annotations.json
//! └── comments.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{Annotation, Comment};
use super::store::{NoteError, NoteStore, Result};
use crate::article::ArticleRef;

pub struct LocalNoteStore {
    notes_dir: PathBuf,
    /// Serializes read-modify-write cycles on the files
    write_lock: Mutex<()>,
}

impl LocalNoteStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            notes_dir: data_dir.join("notes"),
            write_lock: Mutex::new(()),
        }
    }

    fn annotations_path(&self) -> PathBuf {
        self.notes_dir.join("annotations.json")
    }

    fn comments_path(&self) -> PathBuf {
        self.notes_dir.join("comments.json")
    }

    async fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_list<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        fs::create_dir_all(&self.notes_dir).await?;
        fs::write(path, serde_json::to_string_pretty(items)?).await?;
        Ok(())
    }
}

#[async_trait]
impl NoteStore for LocalNoteStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list_annotations(&self, article: &ArticleRef) -> Result<Vec<Annotation>> {
        let mut annotations: Vec<Annotation> = Self::read_list(&self.annotations_path()).await?;
        annotations.retain(|a| a.article.same_article(article));
        annotations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(annotations)
    }

    async fn list_all_annotations(&self) -> Result<Vec<Annotation>> {
        Self::read_list(&self.annotations_path()).await
    }

    async fn save_annotation(&self, annotation: &Annotation) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.annotations_path();
        let mut annotations: Vec<Annotation> = Self::read_list(&path).await?;

        match annotations.iter_mut().find(|a| a.id == annotation.id) {
            Some(existing) => *existing = annotation.clone(),
            None => annotations.push(annotation.clone()),
        }
        self.write_list(&path, &annotations).await
    }

    async fn delete_annotation(&self, id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.annotations_path();
        let mut annotations: Vec<Annotation> = Self::read_list(&path).await?;

        let before = annotations.len();
        annotations.retain(|a| a.id != id);
        if annotations.len() == before {
            return Err(NoteError::NotFound(id));
        }
        self.write_list(&path, &annotations).await
    }

    async fn list_comments(&self, article: &ArticleRef) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = Self::read_list(&self.comments_path()).await?;
        comments.retain(|c| c.article.same_article(article));
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn list_all_comments(&self) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = Self::read_list(&self.comments_path()).await?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn add_comment(&self, comment: &Comment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.comments_path();
        let mut comments: Vec<Comment> = Self::read_list(&path).await?;

        match comments.iter_mut().find(|c| c.id == comment.id) {
            Some(existing) => *existing = comment.clone(),
            None => comments.push(comment.clone()),
        }
        self.write_list(&path, &comments).await
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.comments_path();
        let mut comments: Vec<Comment> = Self::read_list(&path).await?;

        let before = comments.len();
        comments.retain(|c| c.id != id);
        if comments.len() == before {
            return Err(NoteError::NotFound(id));
        }
        self.write_list(&path, &comments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalNoteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalNoteStore::new(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (store, _temp) = create_test_store();
        let article = ArticleRef::new("cf88", "art5", "5º");
        assert!(store.list_annotations(&article).await.unwrap().is_empty());
        assert!(store.list_comments(&article).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_filters_by_article_and_upserts() {
        let (store, _temp) = create_test_store();
        let art5 = ArticleRef::new("cf88", "art5", "5º");
        let art6 = ArticleRef::new("cf88", "art6", "6º");

        let mut note = Annotation::new(art5.clone(), "Igualdade".to_string());
        store.save_annotation(&note).await.unwrap();
        store
            .save_annotation(&Annotation::new(art6.clone(), "Direitos sociais".to_string()))
            .await
            .unwrap();

        note.content = "Igualdade formal e material".to_string();
        store.save_annotation(&note).await.unwrap();

        let notes = store.list_annotations(&art5).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "Igualdade formal e material");
        assert_eq!(store.list_all_annotations().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_annotation() {
        let (store, _temp) = create_test_store();
        let note = Annotation::new(ArticleRef::new("cc", "art1", "1"), "nota".to_string());
        store.save_annotation(&note).await.unwrap();

        store.delete_annotation(note.id).await.unwrap();
        assert!(matches!(
            store.delete_annotation(note.id).await,
            Err(NoteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_comments_newest_first() {
        let (store, _temp) = create_test_store();
        let article = ArticleRef::new("cp", "art121", "121");

        let mut first = Comment::new(article.clone(), "u1".to_string(), "Ana".to_string(), "Primeiro".to_string());
        first.created_at = first.created_at - chrono::Duration::minutes(5);
        let second = Comment::new(article.clone(), "u2".to_string(), "Bruno".to_string(), "Segundo".to_string());
        store.add_comment(&first).await.unwrap();
        store.add_comment(&second).await.unwrap();

        let comments = store.list_comments(&article).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, second.id);

        let all = store.list_all_comments().await.unwrap();
        assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first.id, second.id]);

        store.delete_comment(first.id).await.unwrap();
        assert_eq!(store.list_comments(&article).await.unwrap().len(), 1);
    }
}
