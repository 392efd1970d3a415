//! In-memory study state: cards, the session log and goals
//!
//! The store is the single writer of study data. Callers persist it with
//! [`StudyStorage`](super::storage::StudyStorage) after mutating.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, Utc};
use uuid::Uuid;

use super::algorithm::apply_review;
use super::goals::{current_streak, longest_streak};
use super::models::*;
use super::storage::{Result, StudyError};
use crate::article::ArticleRef;

/// A study-mode run that has not been logged yet
#[derive(Debug, Clone)]
struct ActiveSession {
    started_at: DateTime<Utc>,
    cards_reviewed: u32,
    correct_answers: u32,
}

#[derive(Debug, Default)]
pub struct StudyStore {
    data: StudyData,
    active_session: Option<ActiveSession>,
}

impl StudyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: StudyData) -> Self {
        Self {
            data,
            active_session: None,
        }
    }

    pub fn data(&self) -> &StudyData {
        &self.data
    }

    pub fn into_data(self) -> StudyData {
        self.data
    }

    // ==================== Cards ====================

    pub fn cards(&self) -> &[StudyCard] {
        &self.data.cards
    }

    pub fn get_card(&self, card_id: Uuid) -> Option<&StudyCard> {
        self.data.cards.iter().find(|c| c.id == card_id)
    }

    pub fn find_card(&self, article: &ArticleRef) -> Option<&StudyCard> {
        self.data.cards.iter().find(|c| c.matches(article))
    }

    /// Add an article to study. Adding an article that already has a card
    /// returns the existing card unchanged.
    pub fn add_card(&mut self, article: &ArticleRef, content: &str) -> Result<StudyCard> {
        self.add_card_at(article, content, Utc::now())
    }

    pub fn add_card_at(&mut self, article: &ArticleRef, content: &str, now: DateTime<Utc>) -> Result<StudyCard> {
        if !article.is_valid() {
            return Err(StudyError::InvalidArticle);
        }
        if let Some(existing) = self.find_card(article) {
            return Ok(existing.clone());
        }

        let card = StudyCard::new(article, content, now);
        log::info!(
            "Added study card {} for {} art. {}",
            card.id,
            card.code_id,
            card.article_number
        );
        self.data.cards.push(card.clone());
        Ok(card)
    }

    /// Add cards for every article not already studied, e.g. from the
    /// favorites list. Invalid references are skipped. Returns how many
    /// cards were created.
    pub fn add_cards_from<'a, I>(&mut self, articles: I, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = (&'a ArticleRef, &'a str)>,
    {
        let mut added = 0;
        for (article, content) in articles {
            if !article.is_valid() || self.find_card(article).is_some() {
                continue;
            }
            self.data.cards.push(StudyCard::new(article, content, now));
            added += 1;
        }
        added
    }

    pub fn remove_card(&mut self, card_id: Uuid) -> bool {
        let before = self.data.cards.len();
        self.data.cards.retain(|c| c.id != card_id);
        self.data.cards.len() != before
    }

    /// Record an answer for a card. Unknown ids change nothing.
    pub fn review_card(&mut self, card_id: Uuid, correct: bool) -> Option<StudyCard> {
        self.review_card_at(card_id, correct, Utc::now(), Local::now().date_naive())
    }

    pub fn review_card_at(
        &mut self,
        card_id: Uuid,
        correct: bool,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Option<StudyCard> {
        let card = self.data.cards.iter_mut().find(|c| c.id == card_id)?;
        apply_review(card, correct, now);
        let updated = card.clone();

        if let Some(session) = self.active_session.as_mut() {
            session.cards_reviewed += 1;
            if correct {
                session.correct_answers += 1;
            }
        }
        for goal in &mut self.data.goals {
            goal.add_progress(1, today);
        }

        log::debug!(
            "Reviewed card {} ({}): difficulty {}, next review {}",
            updated.id,
            if correct { "correct" } else { "wrong" },
            updated.difficulty,
            updated.next_review
        );
        Some(updated)
    }

    /// Cards due now, most overdue first
    pub fn cards_for_review(&self) -> Vec<&StudyCard> {
        self.cards_for_review_at(Utc::now())
    }

    pub fn cards_for_review_at(&self, now: DateTime<Utc>) -> Vec<&StudyCard> {
        let mut due: Vec<&StudyCard> = self.data.cards.iter().filter(|c| c.is_due(now)).collect();
        due.sort_by(|a, b| a.next_review.cmp(&b.next_review));
        due
    }

    // ==================== Sessions ====================

    pub fn sessions(&self) -> &[StudySession] {
        &self.data.sessions
    }

    pub fn has_active_session(&self) -> bool {
        self.active_session.is_some()
    }

    /// Enter study mode. A session already in progress is kept.
    pub fn start_session(&mut self) {
        self.start_session_at(Utc::now());
    }

    pub fn start_session_at(&mut self, now: DateTime<Utc>) {
        if self.active_session.is_none() {
            self.active_session = Some(ActiveSession {
                started_at: now,
                cards_reviewed: 0,
                correct_answers: 0,
            });
        }
    }

    /// Leave study mode and log the session. Returns `None` when no session
    /// was active.
    pub fn end_session(&mut self) -> Option<StudySession> {
        self.end_session_at(Utc::now())
    }

    pub fn end_session_at(&mut self, now: DateTime<Utc>) -> Option<StudySession> {
        let active = self.active_session.take()?;
        let duration_secs = (now - active.started_at).num_seconds().max(0) as u64;

        let session = StudySession {
            id: Uuid::new_v4(),
            started_at: active.started_at,
            ended_at: now,
            duration_secs,
            cards_reviewed: active.cards_reviewed,
            correct_answers: active.correct_answers,
        };
        log::info!(
            "Study session logged: {}s, {} cards reviewed",
            session.duration_secs,
            session.cards_reviewed
        );
        self.data.sessions.push(session.clone());
        Some(session)
    }

    /// Local dates that have at least one logged session
    fn session_days(&self) -> BTreeSet<NaiveDate> {
        self.data
            .sessions
            .iter()
            .map(|s| s.ended_at.with_timezone(&Local).date_naive())
            .collect()
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak_on(Local::now().date_naive())
    }

    pub fn current_streak_on(&self, today: NaiveDate) -> u32 {
        current_streak(&self.session_days(), today)
    }

    // ==================== Goals ====================

    pub fn goals(&self) -> &[StudyGoal] {
        &self.data.goals
    }

    pub fn add_goal(&mut self, title: &str, period: GoalPeriod, target: u32, today: NaiveDate) -> Result<StudyGoal> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StudyError::InvalidGoal("title is empty".to_string()));
        }
        if target == 0 {
            return Err(StudyError::InvalidGoal("target must be at least 1".to_string()));
        }

        let goal = StudyGoal::new(title.to_string(), period, target, today, Utc::now());
        self.data.goals.push(goal.clone());
        Ok(goal)
    }

    pub fn remove_goal(&mut self, goal_id: Uuid) -> Result<()> {
        let before = self.data.goals.len();
        self.data.goals.retain(|g| g.id != goal_id);
        if self.data.goals.len() == before {
            return Err(StudyError::GoalNotFound(goal_id));
        }
        Ok(())
    }

    /// Manually advance a goal
    pub fn record_goal_progress(&mut self, goal_id: Uuid, amount: u32, today: NaiveDate) -> Result<StudyGoal> {
        let goal = self
            .data
            .goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or(StudyError::GoalNotFound(goal_id))?;
        goal.add_progress(amount, today);
        Ok(goal.clone())
    }

    /// Roll every goal window to `today`
    pub fn refresh_goals(&mut self, today: NaiveDate) {
        for goal in &mut self.data.goals {
            if goal.roll_to(today) {
                log::debug!("Goal '{}' moved to a new window starting {}", goal.title, goal.window_start);
            }
        }
    }

    // ==================== Statistics ====================

    pub fn stats(&self) -> StudyStats {
        self.stats_at(Utc::now(), Local::now().date_naive())
    }

    pub fn stats_at(&self, now: DateTime<Utc>, today: NaiveDate) -> StudyStats {
        let cards = &self.data.cards;
        let total_answers: u32 = cards.iter().map(|c| c.total_answers).sum();
        let correct_answers: u32 = cards.iter().map(|c| c.correct_answers).sum();
        let days = self.session_days();

        StudyStats {
            total_cards: cards.len(),
            due_cards: cards.iter().filter(|c| c.is_due(now)).count(),
            mastered_cards: cards.iter().filter(|c| c.is_mastered()).count(),
            hard_cards: cards.iter().filter(|c| c.difficulty == Difficulty::Hard).count(),
            accuracy: if total_answers == 0 {
                0.0
            } else {
                correct_answers as f64 / total_answers as f64
            },
            total_reviews: cards.iter().map(|c| c.times_reviewed).sum(),
            total_study_secs: self.data.sessions.iter().map(|s| s.duration_secs).sum(),
            sessions_today: self
                .data
                .sessions
                .iter()
                .filter(|s| s.ended_at.with_timezone(&Local).date_naive() == today)
                .count(),
            current_streak: current_streak(&days, today),
            longest_streak: longest_streak(&days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    /// Noon local time on `date`, as UTC
    fn local_noon(date: NaiveDate) -> DateTime<Utc> {
        Local
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .unwrap()
            .with_timezone(&Utc)
    }

    fn article(n: u32) -> ArticleRef {
        ArticleRef::new("cc", format!("art{}", n), n.to_string())
    }

    #[test]
    fn test_add_card_is_idempotent_per_article() {
        let mut store = StudyStore::new();
        let first = store.add_card_at(&article(1), "Toda pessoa é capaz", now()).unwrap();
        let second = store.add_card_at(&article(1), "texto diferente", now()).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.cards().len(), 1);
        assert_eq!(first.difficulty, Difficulty::Medium);
        assert!(first.is_due(now()));
    }

    #[test]
    fn test_add_card_rejects_invalid_article() {
        let mut store = StudyStore::new();
        let result = store.add_card_at(&ArticleRef::new("", "art1", "1"), "x", now());
        assert!(matches!(result, Err(StudyError::InvalidArticle)));
        assert!(store.cards().is_empty());
    }

    #[test]
    fn test_add_cards_from_favorites() {
        let mut store = StudyStore::new();
        store.add_card_at(&article(1), "um", now()).unwrap();

        let favorites = vec![
            (article(1), "um".to_string()),
            (article(2), "dois".to_string()),
            (ArticleRef::new("cc", "", "3"), "inválido".to_string()),
            (article(4), "quatro".to_string()),
        ];
        let added = store.add_cards_from(favorites.iter().map(|(a, c)| (a, c.as_str())), now());

        assert_eq!(added, 2);
        assert_eq!(store.cards().len(), 3);
    }

    #[test]
    fn test_review_unknown_card_changes_nothing() {
        let mut store = StudyStore::new();
        store.add_card_at(&article(1), "um", now()).unwrap();
        store.add_card_at(&article(2), "dois", now()).unwrap();
        let before = store.data().clone();

        assert!(store.review_card_at(Uuid::new_v4(), true, now(), today()).is_none());
        assert_eq!(store.data(), &before);
    }

    #[test]
    fn test_review_updates_card() {
        let mut store = StudyStore::new();
        let card = store.add_card_at(&article(1), "um", now()).unwrap();

        let reviewed = store.review_card_at(card.id, true, now(), today()).unwrap();
        assert_eq!(reviewed.times_reviewed, 1);
        assert_eq!(reviewed.streak, 1);
        assert_eq!(reviewed.next_review, now() + Duration::days(2));
        assert_eq!(store.get_card(card.id), Some(&reviewed));
    }

    #[test]
    fn test_cards_for_review_sorted_and_filtered() {
        let mut store = StudyStore::new();
        let a = store.add_card_at(&article(1), "um", now() - Duration::days(3)).unwrap();
        let b = store.add_card_at(&article(2), "dois", now() - Duration::days(5)).unwrap();
        let c = store.add_card_at(&article(3), "três", now()).unwrap();
        // Pushed into the future
        store.review_card_at(c.id, true, now(), today()).unwrap();

        let due: Vec<Uuid> = store.cards_for_review_at(now()).iter().map(|c| c.id).collect();
        assert_eq!(due, vec![b.id, a.id]);
        assert!(store.cards_for_review_at(now()).iter().all(|c| c.next_review <= now()));
    }

    #[test]
    fn test_remove_card() {
        let mut store = StudyStore::new();
        let card = store.add_card_at(&article(1), "um", now()).unwrap();
        assert!(store.remove_card(card.id));
        assert!(!store.remove_card(card.id));
        assert!(store.cards().is_empty());
    }

    #[test]
    fn test_session_counts_reviews() {
        let mut store = StudyStore::new();
        let card = store.add_card_at(&article(1), "um", now()).unwrap();

        store.start_session_at(now());
        store.start_session_at(now() + Duration::minutes(5));
        store.review_card_at(card.id, true, now(), today());
        store.review_card_at(card.id, false, now(), today());

        let session = store.end_session_at(now() + Duration::minutes(10)).unwrap();
        assert_eq!(session.duration_secs, 600);
        assert_eq!(session.cards_reviewed, 2);
        assert_eq!(session.correct_answers, 1);
        assert_eq!(store.sessions().len(), 1);
        assert!(store.end_session_at(now()).is_none());
    }

    #[test]
    fn test_streak_from_logged_sessions() {
        let mut store = StudyStore::new();
        for offset in [0, 1, 2, 4] {
            let day = today() - Duration::days(offset);
            store.start_session_at(local_noon(day));
            store.end_session_at(local_noon(day) + Duration::minutes(1));
        }

        assert_eq!(store.current_streak_on(today()), 3);
        assert_eq!(store.current_streak_on(today() + Duration::days(1)), 0);

        let stats = store.stats_at(now(), today());
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 3);
        assert_eq!(stats.sessions_today, 1);
        assert_eq!(stats.total_study_secs, 240);
    }

    #[test]
    fn test_reviews_advance_goals() {
        let mut store = StudyStore::new();
        let card = store.add_card_at(&article(1), "um", now()).unwrap();
        let goal = store.add_goal("Revisões diárias", GoalPeriod::Daily, 2, today()).unwrap();

        store.review_card_at(card.id, true, now(), today());
        store.review_card_at(card.id, false, now(), today());
        assert!(store.goals()[0].is_completed());

        store.refresh_goals(today() + Duration::days(1));
        assert_eq!(store.goals()[0].progress, 0);

        let updated = store.record_goal_progress(goal.id, 3, today() + Duration::days(1)).unwrap();
        assert_eq!(updated.progress, 3);
    }

    #[test]
    fn test_goal_validation_and_removal() {
        let mut store = StudyStore::new();
        assert!(matches!(
            store.add_goal("  ", GoalPeriod::Weekly, 5, today()),
            Err(StudyError::InvalidGoal(_))
        ));
        assert!(matches!(
            store.add_goal("Meta", GoalPeriod::Weekly, 0, today()),
            Err(StudyError::InvalidGoal(_))
        ));

        let goal = store.add_goal("Meta", GoalPeriod::Monthly, 50, today()).unwrap();
        store.remove_goal(goal.id).unwrap();
        assert!(matches!(store.remove_goal(goal.id), Err(StudyError::GoalNotFound(_))));
    }

    #[test]
    fn test_stats() {
        let mut store = StudyStore::new();
        let card = store.add_card_at(&article(1), "um", now()).unwrap();
        store.add_card_at(&article(2), "dois", now()).unwrap();
        for _ in 0..4 {
            store.review_card_at(card.id, true, now(), today());
        }

        let stats = store.stats_at(now(), today());
        assert_eq!(stats.total_cards, 2);
        assert_eq!(stats.due_cards, 1);
        assert_eq!(stats.mastered_cards, 1);
        assert_eq!(stats.accuracy, 1.0);
        assert_eq!(stats.total_reviews, 4);
        assert_eq!(stats.current_streak, 0);
    }
}
