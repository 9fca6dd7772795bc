//! Streak calculation over completion dates.
//!
//! Streaks are counted in calendar days. A day counts once no matter how
//! many habits were completed on it.

use crate::{CompletionEvent, StreakStats};
use chrono::{Days, NaiveDate};
use std::collections::BTreeSet;

/// Collapse a user's completion events into the set of days with activity
pub fn completion_dates<'a, I>(events: I, user_id: &str) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = &'a CompletionEvent>,
{
    events
        .into_iter()
        .filter(|e| e.user_id == user_id)
        .map(|e| e.completed_on)
        .collect()
}

/// Compute current and longest streaks
///
/// The current streak is anchored on `today` when today has a completion,
/// otherwise on yesterday. An unfinished today does not break a streak
/// that ran through yesterday, but any earlier gap does.
pub fn compute_streaks(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakStats {
    let Some(&last) = dates.iter().next_back() else {
        return StreakStats::default();
    };

    let current_streak = current_streak(dates, today);
    let longest_streak = longest_streak(dates);

    tracing::debug!(
        "Computed streaks over {} days: current {}, longest {}",
        dates.len(),
        current_streak,
        longest_streak
    );

    StreakStats {
        current_streak,
        longest_streak,
        last_completed_date: Some(last),
    }
}

fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today.checked_sub_days(Days::new(1));
    let mut check = if dates.contains(&today) {
        today
    } else {
        match yesterday {
            Some(day) if dates.contains(&day) => day,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while dates.contains(&check) {
        streak += 1;
        match check.checked_sub_days(Days::new(1)) {
            Some(prev) => check = prev,
            None => break,
        }
    }
    streak
}

fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    // Newest first
    for &date in dates.iter().rev() {
        run = match prev {
            Some(p) if p.checked_sub_days(Days::new(1)) == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }

    longest
}
