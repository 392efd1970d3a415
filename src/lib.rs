//! Vade mecum core: study scheduling, audio commentary playback, favorites
//! and notes for Brazilian legal codes.

pub mod article;
pub mod config;
pub mod favorites;
pub mod notes;
pub mod playback;
pub mod study;

pub use article::ArticleRef;
pub use config::AppConfig;
pub use playback::PlaybackCoordinator;
pub use study::{StudyStorage, StudyStore};
