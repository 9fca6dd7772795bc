//! Per-day completion counts for history views.

use crate::{CompletionEvent, DailyActivity, DateRange, Error, Result};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Longest history window that can be requested, about ten years
pub const MAX_HISTORY_DAYS: u32 = 3660;

/// Group a user's completions by day over `range`
///
/// Every day in the range gets an entry, including days with no activity.
/// XP per day is the completion count times `reward`.
pub fn daily_activity<'a, I>(
    events: I,
    user_id: &str,
    range: DateRange,
    reward: i64,
) -> Vec<DailyActivity>
where
    I: IntoIterator<Item = &'a CompletionEvent>,
{
    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for event in events {
        if event.user_id == user_id && range.contains(event.completed_on) {
            *counts.entry(event.completed_on).or_default() += 1;
        }
    }

    let mut days = Vec::new();
    let mut date = range.start;
    while date <= range.end {
        let completions = counts.get(&date).copied().unwrap_or(0);
        days.push(DailyActivity {
            date,
            completions,
            xp: i64::from(completions) * reward,
        });
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    days
}

/// The trailing window of `days` days ending on `today`
///
/// Windows longer than [`MAX_HISTORY_DAYS`], or reaching before the
/// earliest representable date, are rejected.
pub fn trailing_window(today: NaiveDate, days: u32) -> Result<DateRange> {
    if days > MAX_HISTORY_DAYS {
        return Err(Error::Validation(format!(
            "history window of {} days exceeds the maximum of {}",
            days, MAX_HISTORY_DAYS
        )));
    }

    let span = u64::from(days.max(1)) - 1;
    let start = today.checked_sub_days(Days::new(span)).ok_or_else(|| {
        Error::Validation(format!(
            "history window of {} days starts before {}",
            days,
            NaiveDate::MIN
        ))
    })?;
    Ok(DateRange::new(start, today))
}
