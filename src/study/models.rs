//! Data models for study mode

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::{excerpt, ArticleRef};

/// Difficulty tier of a card, drives the review interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(label)
    }
}

/// Spaced repetition record for one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyCard {
    pub id: Uuid,
    pub article_id: String,
    pub code_id: String,
    pub article_number: String,
    /// Article text, truncated
    pub content: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    /// When the card is due again
    pub next_review: DateTime<Utc>,
    #[serde(default)]
    pub times_reviewed: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub total_answers: u32,
    /// Consecutive correct answers
    #[serde(default)]
    pub streak: u32,
    pub created_at: DateTime<Utc>,
}

impl StudyCard {
    /// A fresh card is medium difficulty and due immediately
    pub fn new(article: &ArticleRef, content: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            article_id: article.article_id.clone(),
            code_id: article.code_id.clone(),
            article_number: article.article_number.clone(),
            content: excerpt(content),
            difficulty: Difficulty::Medium,
            last_reviewed: None,
            next_review: now,
            times_reviewed: 0,
            correct_answers: 0,
            total_answers: 0,
            streak: 0,
            created_at: now,
        }
    }

    pub fn article(&self) -> ArticleRef {
        ArticleRef::new(&self.code_id, &self.article_id, &self.article_number)
    }

    pub fn matches(&self, article: &ArticleRef) -> bool {
        self.code_id == article.code_id && self.article_id == article.article_id
    }

    /// Share of correct answers, 0.0 before the first answer
    pub fn accuracy(&self) -> f64 {
        if self.total_answers == 0 {
            0.0
        } else {
            self.correct_answers as f64 / self.total_answers as f64
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }

    /// Promoted to easy and past the learning reviews
    pub fn is_mastered(&self) -> bool {
        self.difficulty == Difficulty::Easy && self.times_reviewed > 3
    }
}

/// One run of study mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Time spent in seconds
    pub duration_secs: u64,
    #[serde(default)]
    pub cards_reviewed: u32,
    #[serde(default)]
    pub correct_answers: u32,
}

/// Period a goal is measured over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
}

/// User-defined review target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGoal {
    pub id: Uuid,
    pub title: String,
    pub period: GoalPeriod,
    /// Number of reviews to reach within the window
    pub target: u32,
    #[serde(default)]
    pub progress: u32,
    /// First day of the current window (inclusive)
    pub window_start: NaiveDate,
    /// Last day of the current window (inclusive)
    pub window_end: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Aggregate numbers for the study dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub total_cards: usize,
    pub due_cards: usize,
    pub mastered_cards: usize,
    pub hard_cards: usize,
    /// Correct answers over all answers, 0.0 - 1.0
    pub accuracy: f64,
    pub total_reviews: u32,
    pub total_study_secs: u64,
    pub sessions_today: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Everything study mode persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudyData {
    pub cards: Vec<StudyCard>,
    pub sessions: Vec<StudySession>,
    pub goals: Vec<StudyGoal>,
}
