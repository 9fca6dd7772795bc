//! Core domain types for the habit tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Habits and completion events
//! - Derived streak statistics and XP/level state
//! - Achievement definitions and per-user progress
//! - Milestone badges and per-day activity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{Error, Result};

// ============================================================================
// Habit Types
// ============================================================================

/// How often a habit is meant to be performed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// A habit owned by a user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub frequency: Frequency,
    pub target_completion: u32,
    pub color: String,
}

impl Habit {
    /// Create a new daily habit with a fresh id
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            description: None,
            created_at: now,
            frequency: Frequency::Daily,
            target_completion: 1,
            color: "#10b981".into(),
        }
    }

    /// Reject habits that cannot be stored or displayed
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation("habit id is empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(Error::Validation(format!("habit {} has an empty title", self.id)));
        }
        if self.target_completion == 0 {
            return Err(Error::Validation(format!(
                "habit {} has a zero target_completion",
                self.id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Completion Types
// ============================================================================

/// A habit marked done on a calendar day
///
/// At most one event exists per (habit_id, user_id, completed_on).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletionEvent {
    pub id: Uuid,
    pub habit_id: String,
    pub user_id: String,
    pub completed_on: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CompletionEvent {
    pub fn new(
        habit_id: impl Into<String>,
        user_id: impl Into<String>,
        completed_on: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            habit_id: habit_id.into(),
            user_id: user_id.into(),
            completed_on,
            recorded_at,
            notes: None,
        }
    }

    /// Identity used for the uniqueness invariant
    pub fn key(&self) -> (&str, &str, NaiveDate) {
        (&self.habit_id, &self.user_id, self.completed_on)
    }

    /// Reject records that would corrupt derived statistics
    pub fn validate(&self) -> Result<()> {
        if self.habit_id.trim().is_empty() {
            return Err(Error::Validation(format!("completion {} has no habit_id", self.id)));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation(format!("completion {} has no user_id", self.id)));
        }
        Ok(())
    }
}

/// Inclusive range of calendar days
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// ============================================================================
// Derived Statistics
// ============================================================================

/// Streak statistics derived from completion dates
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StreakStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_completed_date: Option<NaiveDate>,
}

/// Experience points and level for a user
///
/// `xp` is signed so the unclamped policy can represent negative balances.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct XpLevel {
    pub xp: i64,
    pub level: u32,
}

impl Default for XpLevel {
    fn default() -> Self {
        Self { xp: 0, level: 1 }
    }
}

/// Completions and XP earned on a single day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub completions: u32,
    pub xp: i64,
}

// ============================================================================
// Achievement Types
// ============================================================================

/// How an achievement's progress is measured
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    Streak,
    Completion,
    TimeBased,
    Milestone,
}

/// A catalog entry describing a goal with a numeric target
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AchievementDef {
    pub id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub required_value: u32,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
}

/// A user's progress toward one achievement
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserAchievementProgress {
    pub user_id: String,
    pub achievement_id: String,
    pub progress: u32,
    pub achieved: bool,
    pub achieved_at: Option<DateTime<Utc>>,
}

impl UserAchievementProgress {
    /// Fresh record for an achievement the user has not been evaluated on
    pub fn new(user_id: impl Into<String>, achievement_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            achievement_id: achievement_id.into(),
            progress: 0,
            achieved: false,
            achieved_at: None,
        }
    }
}

/// Achievement progress keyed by achievement id
pub type AchievementProgressMap = HashMap<String, UserAchievementProgress>;

// ============================================================================
// Milestone Types
// ============================================================================

/// A streak-length badge
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub days: u32,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub achieved: bool,
}

impl Milestone {
    pub fn new(days: u32, name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            days,
            name: name.into(),
            icon: icon.into(),
            achieved: false,
        }
    }
}

// ============================================================================
// Profile Type
// ============================================================================

/// A user's persisted habits, XP and achievement progress
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub xp: XpLevel,
    #[serde(default)]
    pub achievements: AchievementProgressMap,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}
