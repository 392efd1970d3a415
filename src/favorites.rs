//! Favorite articles, stored in `{data_dir}/favorites.json`

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::article::{excerpt, ArticleRef};

#[derive(Error, Debug)]
pub enum FavoritesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid article: code and article ids are required")]
    InvalidArticle,
}

pub type Result<T> = std::result::Result<T, FavoritesError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub article: ArticleRef,
    /// Excerpt of the article text
    #[serde(default)]
    pub content: String,
    pub added_at: DateTime<Utc>,
}

pub struct FavoritesStorage {
    path: PathBuf,
}

impl FavoritesStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join("favorites.json"),
        }
    }

    /// Favorites, most recently added first
    pub fn list(&self) -> Result<Vec<Favorite>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut favorites: Vec<Favorite> = serde_json::from_str(&content)?;
        favorites.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(favorites)
    }

    pub fn contains(&self, article: &ArticleRef) -> Result<bool> {
        Ok(self.list()?.iter().any(|f| f.article.same_article(article)))
    }

    /// Add an article; an existing favorite is returned unchanged
    pub fn add(&self, article: ArticleRef, content: &str) -> Result<Favorite> {
        if !article.is_valid() {
            return Err(FavoritesError::InvalidArticle);
        }

        let mut favorites = self.list()?;
        if let Some(existing) = favorites.iter().find(|f| f.article.same_article(&article)) {
            return Ok(existing.clone());
        }

        let favorite = Favorite {
            article,
            content: excerpt(content),
            added_at: Utc::now(),
        };
        favorites.push(favorite.clone());
        self.save(&favorites)?;
        Ok(favorite)
    }

    /// Returns whether anything was removed
    pub fn remove(&self, article: &ArticleRef) -> Result<bool> {
        let mut favorites = self.list()?;
        let before = favorites.len();
        favorites.retain(|f| !f.article.same_article(article));
        if favorites.len() == before {
            return Ok(false);
        }
        self.save(&favorites)?;
        Ok(true)
    }

    fn save(&self, favorites: &[Favorite]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(favorites)?)?;
        Ok(())
    }
}
