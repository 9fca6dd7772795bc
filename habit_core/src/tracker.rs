//! Tracker orchestration.
//!
//! Ties the repository to the statistics engine: marking a habit done
//! records the completion, awards XP, levels up, re-evaluates achievements
//! and persists the profile.

use crate::activity::{daily_activity, trailing_window};
use crate::ledger::CompactionStats;
use crate::{
    achievements, apply_completion_delta, check_level_up, compute_streaks, completion_dates,
    match_milestones, next_milestone, Catalog, CompletionEvent, DailyActivity, Error, Habit,
    HabitRepository, Milestone, NextMilestone, Result, StreakStats, UserProfile, XpLevel,
    XpPolicy,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Result of marking or un-marking a habit
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionOutcome {
    /// `false` when the call was a no-op (already done / nothing to undo)
    pub changed: bool,
    pub xp: XpLevel,
    pub levels_gained: u32,
    pub streak: StreakStats,
    /// Achievement ids earned by this call
    pub unlocked: Vec<String>,
}

/// Everything the stats view shows
#[derive(Clone, Debug, PartialEq)]
pub struct StatsSummary {
    pub streak: StreakStats,
    pub xp: XpLevel,
    pub xp_per_level: i64,
    pub completion_count: u32,
    pub milestones: Vec<Milestone>,
    pub next_milestone: Option<NextMilestone>,
}

/// Habit tracker for a single user over a repository
pub struct Tracker<R: HabitRepository> {
    repo: R,
    user_id: String,
    catalog: Catalog,
    policy: XpPolicy,
}

impl<R: HabitRepository> Tracker<R> {
    /// Create a tracker, rejecting catalogs the engine cannot evaluate
    pub fn new(
        repo: R,
        user_id: impl Into<String>,
        catalog: Catalog,
        policy: XpPolicy,
    ) -> Result<Self> {
        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::Validation(errors.join("; ")));
        }
        if policy.xp_per_level <= 0 {
            return Err(Error::Config(format!(
                "xp_per_level must be positive, got {}",
                policy.xp_per_level
            )));
        }

        Ok(Self {
            repo,
            user_id: user_id.into(),
            catalog,
            policy,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn policy(&self) -> &XpPolicy {
        &self.policy
    }

    pub fn profile(&self) -> Result<UserProfile> {
        self.repo.load_profile(&self.user_id)
    }

    // ========================================================================
    // Habits
    // ========================================================================

    /// Add a habit to the user's profile
    pub fn add_habit(&mut self, habit: Habit) -> Result<Habit> {
        habit.validate()?;
        if habit.user_id != self.user_id {
            return Err(Error::Validation(format!(
                "habit {} belongs to {}, not {}",
                habit.id, habit.user_id, self.user_id
            )));
        }

        let _lock = self.repo.lock_writes()?;
        let mut profile = self.profile()?;
        if profile
            .habits
            .iter()
            .any(|h| h.title.eq_ignore_ascii_case(&habit.title))
        {
            return Err(Error::Validation(format!(
                "a habit named '{}' already exists",
                habit.title
            )));
        }

        profile.habits.push(habit.clone());
        self.repo.save_profile(&profile)?;
        tracing::info!("Added habit '{}' ({})", habit.title, habit.id);
        Ok(habit)
    }

    /// Find a habit by id, id prefix, or case-insensitive title
    pub fn find_habit(&self, query: &str) -> Result<Habit> {
        let profile = self.profile()?;

        if let Some(h) = profile
            .habits
            .iter()
            .find(|h| h.id == query || h.title.eq_ignore_ascii_case(query))
        {
            return Ok(h.clone());
        }

        let mut prefixed = profile.habits.iter().filter(|h| h.id.starts_with(query));
        match (prefixed.next(), prefixed.next()) {
            (Some(h), None) if !query.is_empty() => Ok(h.clone()),
            (Some(_), Some(_)) => Err(Error::Validation(format!(
                "'{}' matches more than one habit",
                query
            ))),
            _ => Err(Error::NotFound(format!("habit '{}'", query))),
        }
    }

    // ========================================================================
    // Completions
    // ========================================================================

    /// Mark a habit done on `date`
    ///
    /// If the profile cannot be saved afterwards, the completion is taken
    /// back out of the ledger so a retry awards the XP again.
    pub fn complete(
        &mut self,
        habit_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<CompletionOutcome> {
        let _lock = self.repo.lock_writes()?;
        self.require_habit(habit_id)?;

        let event = CompletionEvent::new(habit_id, self.user_id.clone(), date, now);
        let changed = self.repo.record_completion(&event)?;
        let outcome = self.apply_change(changed, true, now, today);

        if changed && outcome.is_err() {
            if let Err(e) = self.repo.remove_completion(habit_id, &self.user_id, date, now) {
                tracing::error!(
                    "Failed to roll back completion of {} on {}: {}",
                    habit_id,
                    date,
                    e
                );
            }
        }
        outcome
    }

    /// Un-mark a habit on `date`
    pub fn uncomplete(
        &mut self,
        habit_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<CompletionOutcome> {
        let _lock = self.repo.lock_writes()?;
        self.require_habit(habit_id)?;

        let changed = self
            .repo
            .remove_completion(habit_id, &self.user_id, date, now)?;
        let outcome = self.apply_change(changed, false, now, today);

        if changed && outcome.is_err() {
            let event = CompletionEvent::new(habit_id, self.user_id.clone(), date, now);
            if let Err(e) = self.repo.record_completion(&event) {
                tracing::error!(
                    "Failed to restore completion of {} on {}: {}",
                    habit_id,
                    date,
                    e
                );
            }
        }
        outcome
    }

    fn require_habit(&self, habit_id: &str) -> Result<()> {
        let profile = self.profile()?;
        if profile.habits.iter().any(|h| h.id == habit_id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("habit '{}'", habit_id)))
        }
    }

    fn apply_change(
        &mut self,
        changed: bool,
        completed: bool,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<CompletionOutcome> {
        let mut profile = self.profile()?;
        let events = self.repo.load_completions(&self.user_id, None)?;
        let streak = compute_streaks(&completion_dates(&events, &self.user_id), today);

        if !changed {
            return Ok(CompletionOutcome {
                changed,
                xp: profile.xp,
                levels_gained: 0,
                streak,
                unlocked: Vec::new(),
            });
        }

        let before_level = profile.xp.level;
        let delta = self.policy.delta(completed);
        profile.xp = check_level_up(
            apply_completion_delta(profile.xp, delta, &self.policy),
            self.policy.xp_per_level,
        );

        let before = profile.achievements.clone();
        profile.achievements = achievements::evaluate(
            &self.user_id,
            &self.catalog.achievements,
            &streak,
            count(&events),
            &before,
            now,
        );
        let unlocked = achievements::newly_unlocked(&before, &profile.achievements);

        self.repo.save_profile(&profile)?;

        tracing::info!(
            "{} habit: XP {} level {} (streak {})",
            if completed { "Completed" } else { "Un-completed" },
            profile.xp.xp,
            profile.xp.level,
            streak.current_streak
        );

        Ok(CompletionOutcome {
            changed,
            xp: profile.xp,
            levels_gained: profile.xp.level.saturating_sub(before_level),
            streak,
            unlocked,
        })
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Re-evaluate achievements against current data and persist them
    pub fn refresh_achievements(
        &mut self,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<UserProfile> {
        let _lock = self.repo.lock_writes()?;
        let mut profile = self.profile()?;
        let events = self.repo.load_completions(&self.user_id, None)?;
        let streak = compute_streaks(&completion_dates(&events, &self.user_id), today);

        profile.achievements = achievements::evaluate(
            &self.user_id,
            &self.catalog.achievements,
            &streak,
            count(&events),
            &profile.achievements,
            now,
        );
        self.repo
            .save_achievement_progress(&self.user_id, &profile.achievements)?;
        Ok(profile)
    }

    /// Streaks, XP and milestones as of `today`
    pub fn summary(&self, today: NaiveDate) -> Result<StatsSummary> {
        let profile = self.profile()?;
        let events = self.repo.load_completions(&self.user_id, None)?;
        let streak = compute_streaks(&completion_dates(&events, &self.user_id), today);

        Ok(StatsSummary {
            milestones: match_milestones(streak.current_streak, &self.catalog.milestones),
            next_milestone: next_milestone(streak.current_streak, &self.catalog.milestones),
            streak,
            xp: profile.xp,
            xp_per_level: self.policy.xp_per_level,
            completion_count: count(&events),
        })
    }

    /// Per-day activity for the last `days` days ending on `today`
    pub fn history(&self, today: NaiveDate, days: u32) -> Result<Vec<DailyActivity>> {
        let range = trailing_window(today, days)?;
        let events = self.repo.load_completions(&self.user_id, Some(range))?;
        Ok(daily_activity(
            &events,
            &self.user_id,
            range,
            self.policy.completion_reward,
        ))
    }

    /// All live completions for the user, newest first
    pub fn completions(&self) -> Result<Vec<CompletionEvent>> {
        self.repo.load_completions(&self.user_id, None)
    }

    /// Compact completion storage
    pub fn compact(&mut self) -> Result<CompactionStats> {
        self.repo.compact_completions()
    }
}

fn count(events: &[CompletionEvent]) -> u32 {
    u32::try_from(events.len()).unwrap_or(u32::MAX)
}
