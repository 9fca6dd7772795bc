#![forbid(unsafe_code)]

//! Core domain model and statistics engine for the habit tracker.
//!
//! This crate provides:
//! - Domain types (habits, completions, achievements, milestones)
//! - Streak, XP/level, achievement and milestone derivation
//! - Default catalogs and validation
//! - Persistence (completion ledger, user profiles, CSV export)
//! - Tracker orchestration over a repository

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod streak;
pub mod xp;
pub mod achievements;
pub mod milestones;
pub mod activity;
pub mod repository;
pub mod ledger;
pub mod profile;
pub mod export;
pub mod tracker;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{default_achievements, default_milestones, Catalog};
pub use config::Config;
pub use streak::{completion_dates, compute_streaks};
pub use xp::{apply_completion_delta, check_level_up, XpPolicy};
pub use achievements::{evaluate, newly_unlocked};
pub use milestones::{match_milestones, next_milestone, NextMilestone};
pub use activity::daily_activity;
pub use repository::{FileRepository, HabitRepository};
pub use export::export_completions_csv;
pub use tracker::{CompletionOutcome, StatsSummary, Tracker};
