//! Review interval algorithm
//!
//! Intervals grow exponentially with the number of reviews and are capped
//! per difficulty tier:
//!
//! | difficulty | interval (days)                  |
//! |------------|----------------------------------|
//! | easy       | `min(30, 2^(times_reviewed + 2))` |
//! | medium     | `min(14, 2^(times_reviewed + 1))` |
//! | hard       | `min(7, 2^times_reviewed)`        |
//!
//! `times_reviewed` is the count of reviews before the one being scheduled.

use chrono::{DateTime, Duration, Utc};

use super::models::{Difficulty, StudyCard};

/// Accuracy above which a card is promoted to easy
pub const PROMOTE_ACCURACY: f64 = 0.8;

/// Reviews a card needs before it can be promoted
pub const PROMOTE_MIN_REVIEWS: u32 = 3;

/// Accuracy below which a card is demoted to hard
pub const DEMOTE_ACCURACY: f64 = 0.5;

/// Days until the next review
pub fn interval_days(difficulty: Difficulty, times_reviewed: u32) -> i64 {
    let (offset, cap) = match difficulty {
        Difficulty::Easy => (2, 30),
        Difficulty::Medium => (1, 14),
        Difficulty::Hard => (0, 7),
    };

    let exponent = times_reviewed.saturating_add(offset);
    // Every cap is below 2^5
    if exponent >= 5 {
        cap
    } else {
        (1i64 << exponent).min(cap)
    }
}

/// Due date for a card reviewed at `now`
pub fn next_review(difficulty: Difficulty, times_reviewed: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(interval_days(difficulty, times_reviewed))
}

/// Difficulty after an answer, from the rolling accuracy
pub fn reevaluate_difficulty(
    current: Difficulty,
    correct_answers: u32,
    total_answers: u32,
    times_reviewed: u32,
) -> Difficulty {
    if total_answers == 0 {
        return current;
    }

    let accuracy = correct_answers as f64 / total_answers as f64;
    if accuracy > PROMOTE_ACCURACY && times_reviewed > PROMOTE_MIN_REVIEWS {
        Difficulty::Easy
    } else if accuracy < DEMOTE_ACCURACY {
        Difficulty::Hard
    } else {
        current
    }
}

/// Apply one answer to a card
pub fn apply_review(card: &mut StudyCard, correct: bool, now: DateTime<Utc>) {
    let previous_reviews = card.times_reviewed;

    card.times_reviewed += 1;
    card.total_answers += 1;
    if correct {
        card.correct_answers += 1;
        card.streak += 1;
    } else {
        card.streak = 0;
    }

    card.difficulty = reevaluate_difficulty(
        card.difficulty,
        card.correct_answers,
        card.total_answers,
        card.times_reviewed,
    );
    card.next_review = next_review(card.difficulty, previous_reviews, now);
    card.last_reviewed = Some(now);
}

/// Format an interval in days to a short label
pub fn format_interval(days: i64) -> String {
    match days {
        d if d <= 0 => "now".to_string(),
        d if d < 7 => format!("{}d", d),
        d if d < 30 => format!("{}w", d / 7),
        d => format!("{}mo", d / 30),
    }
}
