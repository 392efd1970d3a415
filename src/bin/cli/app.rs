use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;

use vademecum_lib::article::ArticleRef;
use vademecum_lib::config::AppConfig;
use vademecum_lib::favorites::FavoritesStorage;
use vademecum_lib::notes::NoteService;
use vademecum_lib::study::{StudyCard, StudyGoal, StudyStorage, StudyStore};

/// Shared application state for CLI commands
pub struct App {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub study_storage: StudyStorage,
    pub study: StudyStore,
    pub favorites: FavoritesStorage,
}

impl App {
    /// Load config and study data. `data_dir` overrides the configured directory.
    pub fn new(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => AppConfig::default_path().context("Failed to get config directory")?,
        };
        let config = AppConfig::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => config.data_dir().context("Failed to get data directory")?,
        };
        log::debug!("Using data directory {}", data_dir.display());

        let study_storage = StudyStorage::new(data_dir.clone());
        let data = study_storage.load().context("Failed to load study data")?;
        let mut study = StudyStore::from_data(data);
        study.refresh_goals(Local::now().date_naive());

        let favorites = FavoritesStorage::new(data_dir.clone());

        Ok(Self {
            config,
            data_dir,
            study_storage,
            study,
            favorites,
        })
    }

    pub fn save_study(&self) -> Result<()> {
        self.study_storage
            .save(self.study.data())
            .context("Failed to save study data")
    }

    pub fn note_service(&self) -> NoteService {
        NoteService::from_config(&self.config, self.data_dir.clone())
    }

    /// Find a card by full id or unique id prefix
    pub fn find_card(&self, id: &str) -> Result<StudyCard> {
        let id_lower = id.to_lowercase();
        let matches: Vec<&StudyCard> = self
            .study
            .cards()
            .iter()
            .filter(|c| c.id.to_string().starts_with(&id_lower))
            .collect();

        match matches.len() {
            0 => bail!("No card matching '{}'", id),
            1 => Ok(matches[0].clone()),
            _ => bail!("Ambiguous card id '{}'. Matches:\n{}", id,
                matches.iter().map(|c| format!("  - {} (Art. {})", c.id, c.article_number)).collect::<Vec<_>>().join("\n")),
        }
    }

    /// Find a goal by full id or unique id prefix
    pub fn find_goal(&self, id: &str) -> Result<StudyGoal> {
        let id_lower = id.to_lowercase();
        let matches: Vec<&StudyGoal> = self
            .study
            .goals()
            .iter()
            .filter(|g| g.id.to_string().starts_with(&id_lower))
            .collect();

        match matches.len() {
            0 => bail!("No goal matching '{}'", id),
            1 => Ok(matches[0].clone()),
            _ => bail!("Ambiguous goal id '{}'. Matches:\n{}", id,
                matches.iter().map(|g| format!("  - {} ({})", g.id, g.title)).collect::<Vec<_>>().join("\n")),
        }
    }
}

/// Build an article reference from CLI arguments
pub fn article_ref(code: &str, article: &str, number: Option<&str>) -> ArticleRef {
    ArticleRef::new(code, article, number.unwrap_or(article))
}
