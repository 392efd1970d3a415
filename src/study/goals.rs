//! Goal windows and streak counting

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use uuid::Uuid;

use super::models::{GoalPeriod, StudyGoal};

impl GoalPeriod {
    /// Inclusive window of this period that contains `date`.
    ///
    /// Weeks start on Monday.
    pub fn window_containing(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            GoalPeriod::Daily => (date, date),
            GoalPeriod::Weekly => {
                let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
                (start, start + Duration::days(6))
            }
            GoalPeriod::Monthly => {
                let start = date.with_day(1).unwrap_or(date);
                let next_month = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                };
                let end = next_month
                    .map(|d| d - Duration::days(1))
                    .unwrap_or(start);
                (start, end)
            }
        }
    }
}

impl StudyGoal {
    pub fn new(title: String, period: GoalPeriod, target: u32, today: NaiveDate, now: DateTime<Utc>) -> Self {
        let (window_start, window_end) = period.window_containing(today);
        Self {
            id: Uuid::new_v4(),
            title,
            period,
            target,
            progress: 0,
            window_start,
            window_end,
            created_at: now,
        }
    }

    /// Move the window forward when `today` has left it. Progress restarts
    /// from zero in the new window. Returns whether the window moved.
    pub fn roll_to(&mut self, today: NaiveDate) -> bool {
        if today >= self.window_start && today <= self.window_end {
            return false;
        }
        let (start, end) = self.period.window_containing(today);
        self.window_start = start;
        self.window_end = end;
        self.progress = 0;
        true
    }

    pub fn add_progress(&mut self, amount: u32, today: NaiveDate) {
        self.roll_to(today);
        self.progress = self.progress.saturating_add(amount);
    }

    pub fn is_completed(&self) -> bool {
        self.progress >= self.target
    }

    /// Progress as a fraction of the target, capped at 1.0
    pub fn completion(&self) -> f32 {
        if self.target == 0 {
            return 1.0;
        }
        (self.progress as f32 / self.target as f32).min(1.0)
    }
}

/// Consecutive days with activity, counted backwards from `today`.
///
/// Stops at the first day without activity, so a day without a session
/// today means no streak.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut check_date = today;

    while days.contains(&check_date) {
        streak += 1;
        check_date = check_date - Duration::days(1);
    }

    streak
}

/// Longest run of consecutive days with activity
pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    for day in days {
        current = match previous {
            Some(prev) if *day - prev == Duration::days(1) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(*day);
    }

    longest
}
