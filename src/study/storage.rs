//! Persistence for study mode
//!
//! Cards, sessions and goals live in a single JSON document under a fixed
//! namespace in the data directory:
//! ```text
//! {data_dir}/
//! └── vademecum-study.json
//! ```

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use super::models::StudyData;

/// File stem of the study document
pub const NAMESPACE: &str = "vademecum-study";

#[derive(Error, Debug)]
pub enum StudyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid article: code and article ids are required")]
    InvalidArticle,

    #[error("Goal not found: {0}")]
    GoalNotFound(Uuid),

    #[error("Invalid goal: {0}")]
    InvalidGoal(String),
}

pub type Result<T> = std::result::Result<T, StudyError>;

/// Reads and writes the study document
pub struct StudyStorage {
    data_dir: PathBuf,
}

impl StudyStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Path of the study document
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", NAMESPACE))
    }

    /// Load the study document, or empty data if none was saved yet
    pub fn load(&self) -> Result<StudyData> {
        let path = self.path();
        if !path.exists() {
            return Ok(StudyData::default());
        }

        let content = fs::read_to_string(&path)?;
        let data: StudyData = serde_json::from_str(&content)?;
        log::debug!(
            "Loaded {} study cards, {} sessions, {} goals",
            data.cards.len(),
            data.sessions.len(),
            data.goals.len()
        );
        Ok(data)
    }

    pub fn save(&self, data: &StudyData) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.path(), serde_json::to_string_pretty(data)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ArticleRef;
    use crate::study::models::StudyCard;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_file() {
        let temp = TempDir::new().unwrap();
        let storage = StudyStorage::new(temp.path().to_path_buf());
        let data = storage.load().unwrap();
        assert!(data.cards.is_empty());
        assert!(data.sessions.is_empty());
        assert!(data.goals.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let storage = StudyStorage::new(temp.path().join("nested"));

        let mut data = StudyData::default();
        data.cards.push(StudyCard::new(
            &ArticleRef::new("cp", "art121", "121"),
            "Matar alguém",
            Utc::now(),
        ));
        storage.save(&data).unwrap();

        assert!(storage.path().ends_with("vademecum-study.json"));
        let loaded = storage.load().unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let storage = StudyStorage::new(temp.path().to_path_buf());
        fs::write(storage.path(), "{not json").unwrap();
        assert!(matches!(storage.load(), Err(StudyError::Json(_))));
    }
}
