//! Storage boundary for the statistics engine.
//!
//! The engine never touches storage itself. Callers load completions and
//! profiles through a [`HabitRepository`], hand plain data to the engine,
//! and write the results back through the same repository.

use crate::ledger::{self, CompactionStats, JsonlLedger, LedgerEntry, LedgerOp, LedgerSink};
use crate::{
    AchievementProgressMap, CompletionEvent, DateRange, Error, Result, UserProfile,
};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

/// Exclusive hold on a repository's writers, released on drop
#[derive(Debug)]
pub struct WriteLock {
    file: Option<File>,
}

impl WriteLock {
    /// A lock for repositories that have nothing to serialize
    pub fn none() -> Self {
        Self { file: None }
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            if let Err(e) = file.unlock() {
                tracing::warn!("Failed to release write lock: {}", e);
            }
        }
    }
}

/// Typed read/write access to completions and user profiles
pub trait HabitRepository {
    /// Live completions for a user, optionally limited to a date range
    fn load_completions(
        &self,
        user_id: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<CompletionEvent>>;

    /// Record a completion; returns `false` if the (habit, user, day) was already done
    fn record_completion(&mut self, event: &CompletionEvent) -> Result<bool>;

    /// Remove a completion as of `now`; returns `false` if there was nothing to remove
    fn remove_completion(
        &mut self,
        habit_id: &str,
        user_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    fn load_profile(&self, user_id: &str) -> Result<UserProfile>;

    fn save_profile(&mut self, profile: &UserProfile) -> Result<()>;

    /// Replace a user's stored achievement progress
    fn save_achievement_progress(
        &mut self,
        user_id: &str,
        progress: &AchievementProgressMap,
    ) -> Result<()> {
        let mut profile = self.load_profile(user_id)?;
        profile.achievements = progress.clone();
        self.save_profile(&profile)
    }

    /// Block other writers until the returned lock is dropped
    ///
    /// Held across a whole read-check-write sequence so that two writers
    /// never act on the same stale view.
    fn lock_writes(&self) -> Result<WriteLock> {
        Ok(WriteLock::none())
    }

    /// Drop superseded history from completion storage
    fn compact_completions(&mut self) -> Result<CompactionStats> {
        Ok(CompactionStats::default())
    }
}

/// Repository backed by a JSONL ledger and per-user JSON profiles
///
/// Layout under the data directory:
/// - `ledger/completions.jsonl`
/// - `profiles/<user_id>.json`
/// - `.lock`, held exclusively by writers
pub struct FileRepository {
    data_dir: PathBuf,
    ledger: JsonlLedger,
}

impl FileRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let ledger = JsonlLedger::new(data_dir.join("ledger").join("completions.jsonl"));
        Self { data_dir, ledger }
    }

    /// Path of a user's profile file
    pub fn profile_path(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.data_dir.join("profiles").join(format!("{}.json", user_id)))
    }

    fn live_events(&self) -> Result<Vec<CompletionEvent>> {
        let entries = ledger::read_entries(self.ledger.path())?;
        Ok(ledger::fold_entries(entries))
    }
}

impl HabitRepository for FileRepository {
    fn load_completions(
        &self,
        user_id: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<CompletionEvent>> {
        let mut events: Vec<CompletionEvent> = self
            .live_events()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| range.map_or(true, |r| r.contains(e.completed_on)))
            .collect();
        events.sort_by(|a, b| b.completed_on.cmp(&a.completed_on));

        tracing::debug!("Loaded {} completions for {}", events.len(), user_id);
        Ok(events)
    }

    fn record_completion(&mut self, event: &CompletionEvent) -> Result<bool> {
        event.validate()?;

        let live = self.live_events()?;
        if ledger::is_live(&live, &event.habit_id, &event.user_id, event.completed_on) {
            tracing::info!(
                "Habit {} already completed on {}",
                event.habit_id,
                event.completed_on
            );
            return Ok(false);
        }

        self.ledger.append(&LedgerEntry {
            op: LedgerOp::Completed,
            event: event.clone(),
        })?;
        Ok(true)
    }

    fn remove_completion(
        &mut self,
        habit_id: &str,
        user_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let live = self.live_events()?;
        let Some(existing) = live.into_iter().find(|e| e.key() == (habit_id, user_id, date))
        else {
            tracing::info!("No completion of {} on {} to remove", habit_id, date);
            return Ok(false);
        };

        self.ledger.append(&LedgerEntry {
            op: LedgerOp::Removed,
            event: CompletionEvent {
                recorded_at: now,
                ..existing
            },
        })?;
        Ok(true)
    }

    fn load_profile(&self, user_id: &str) -> Result<UserProfile> {
        UserProfile::load(&self.profile_path(user_id)?, user_id)
    }

    fn save_profile(&mut self, profile: &UserProfile) -> Result<()> {
        profile.save(&self.profile_path(&profile.user_id)?)
    }

    fn lock_writes(&self) -> Result<WriteLock> {
        std::fs::create_dir_all(&self.data_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.data_dir.join(".lock"))?;
        file.lock_exclusive()?;
        tracing::debug!("Acquired write lock on {:?}", self.data_dir);
        Ok(WriteLock { file: Some(file) })
    }

    fn compact_completions(&mut self) -> Result<CompactionStats> {
        let _lock = self.lock_writes()?;
        ledger::compact(self.ledger.path())
    }
}

/// User ids become file names, so keep them to a safe character set
fn validate_user_id(user_id: &str) -> Result<()> {
    let valid = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !user_id.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid user id '{}'", user_id)))
    }
}
