//! Note store backed by the hosted backend's REST API
//!
//! Tables are exposed PostgREST-style under `{url}/rest/v1/{table}` with
//! `column=eq.value` filters. Requests carry the project key as `apikey` and
//! the user's access token as a bearer token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{Annotation, Comment};
use super::store::{NoteError, NoteStore, Result};
use crate::article::ArticleRef;
use crate::config::BackendConfig;

const ANNOTATIONS_TABLE: &str = "annotations";
const COMMENTS_TABLE: &str = "comments";

/// Row of the `annotations` table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnnotationRow {
    id: Uuid,
    user_id: String,
    code_id: String,
    article_id: String,
    #[serde(default)]
    article_number: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AnnotationRow {
    fn from_annotation(annotation: &Annotation, user_id: &str) -> Self {
        Self {
            id: annotation.id,
            user_id: user_id.to_string(),
            code_id: annotation.article.code_id.clone(),
            article_id: annotation.article.article_id.clone(),
            article_number: annotation.article.article_number.clone(),
            content: annotation.content.clone(),
            created_at: annotation.created_at,
            updated_at: annotation.updated_at,
        }
    }
}

impl From<AnnotationRow> for Annotation {
    fn from(row: AnnotationRow) -> Self {
        Self {
            id: row.id,
            article: ArticleRef::new(row.code_id, row.article_id, row.article_number),
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row of the `comments` table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommentRow {
    id: Uuid,
    user_id: String,
    #[serde(default)]
    author_name: String,
    code_id: String,
    article_id: String,
    #[serde(default)]
    article_number: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentRow {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            user_id: comment.author_id.clone(),
            author_name: comment.author_name.clone(),
            code_id: comment.article.code_id.clone(),
            article_id: comment.article.article_id.clone(),
            article_number: comment.article.article_number.clone(),
            content: comment.content.clone(),
            created_at: comment.created_at,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            article: ArticleRef::new(row.code_id, row.article_id, row.article_number),
            author_id: row.user_id,
            author_name: row.author_name,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

pub struct RemoteNoteStore {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: String,
    user_id: String,
}

impl RemoteNoteStore {
    /// Build a store for the signed-in user described by `config`
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let required = |value: &Option<String>, name: &str| -> Result<String> {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| NoteError::InvalidConfig(format!("{} is not set", name)))
        };

        let base_url = required(&config.url, "backend.url")?
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(NoteError::InvalidConfig(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: required(&config.anon_key, "backend.anon_key")?,
            access_token: required(&config.access_token, "backend.access_token")?,
            user_id: required(&config.user_id, "backend.user_id")?,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }

    fn article_filter(article: &ArticleRef) -> Vec<(&'static str, String)> {
        vec![
            ("code_id", format!("eq.{}", article.code_id)),
            ("article_id", format!("eq.{}", article.article_id)),
        ]
    }

    async fn check(response: Response) -> Result<Response> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NoteError::Unauthorized),
            status if !status.is_success() => Err(NoteError::Server {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(response),
        }
    }

    async fn delete_row(&self, table: &str, id: Uuid) -> Result<()> {
        let response = self
            .request(Method::DELETE, table)
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", self.user_id)),
            ])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let deleted: Vec<serde_json::Value> = Self::check(response).await?.json().await?;
        if deleted.is_empty() {
            return Err(NoteError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for RemoteNoteStore {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn list_annotations(&self, article: &ArticleRef) -> Result<Vec<Annotation>> {
        let mut query = Self::article_filter(article);
        query.push(("user_id", format!("eq.{}", self.user_id)));
        query.push(("order", "created_at.asc".to_string()));

        let response = self
            .request(Method::GET, ANNOTATIONS_TABLE)
            .query(&query)
            .send()
            .await?;
        let rows: Vec<AnnotationRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().map(Annotation::from).collect())
    }

    async fn list_all_annotations(&self) -> Result<Vec<Annotation>> {
        let response = self
            .request(Method::GET, ANNOTATIONS_TABLE)
            .query(&[
                ("user_id", format!("eq.{}", self.user_id)),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<AnnotationRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().map(Annotation::from).collect())
    }

    async fn save_annotation(&self, annotation: &Annotation) -> Result<()> {
        let row = AnnotationRow::from_annotation(annotation, &self.user_id);
        let response = self
            .request(Method::POST, ANNOTATIONS_TABLE)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_annotation(&self, id: Uuid) -> Result<()> {
        self.delete_row(ANNOTATIONS_TABLE, id).await
    }

    async fn list_comments(&self, article: &ArticleRef) -> Result<Vec<Comment>> {
        let mut query = Self::article_filter(article);
        query.push(("order", "created_at.desc".to_string()));

        let response = self
            .request(Method::GET, COMMENTS_TABLE)
            .query(&query)
            .send()
            .await?;
        let rows: Vec<CommentRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn list_all_comments(&self) -> Result<Vec<Comment>> {
        let response = self
            .request(Method::GET, COMMENTS_TABLE)
            .query(&[
                ("user_id", format!("eq.{}", self.user_id)),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<CommentRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn add_comment(&self, comment: &Comment) -> Result<()> {
        // Rows always belong to the signed-in user, including comments
        // written on this device before signing in
        let mut row = CommentRow::from(comment);
        row.user_id = self.user_id.clone();

        let response = self
            .request(Method::POST, COMMENTS_TABLE)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        self.delete_row(COMMENTS_TABLE, id).await
    }
}
