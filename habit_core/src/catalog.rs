//! Default achievement and milestone catalogs.
//!
//! The built-in catalog is built once and cached. User-supplied entries
//! from the config are merged in and validated before they reach the
//! evaluator.

use crate::types::*;
use crate::Config;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached built-in achievements
static DEFAULT_ACHIEVEMENTS: Lazy<Vec<AchievementDef>> = Lazy::new(build_default_achievements);

/// Cached built-in milestones
static DEFAULT_MILESTONES: Lazy<Vec<Milestone>> = Lazy::new(build_default_milestones);

/// The achievement and milestone definitions in effect for a run
#[derive(Clone, Debug)]
pub struct Catalog {
    pub achievements: Vec<AchievementDef>,
    pub milestones: Vec<Milestone>,
}

/// Built-in achievement definitions
pub fn default_achievements() -> &'static [AchievementDef] {
    &DEFAULT_ACHIEVEMENTS
}

/// Built-in streak milestones, shortest first
pub fn default_milestones() -> &'static [Milestone] {
    &DEFAULT_MILESTONES
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            achievements: default_achievements().to_vec(),
            milestones: default_milestones().to_vec(),
        }
    }
}

impl Catalog {
    /// Build the catalog for a config: built-ins plus custom achievements,
    /// and custom milestones in place of the defaults when any are given
    pub fn from_config(config: &Config) -> Self {
        let mut catalog = Self::default();
        catalog
            .achievements
            .extend(config.achievements.custom.iter().cloned());
        if !config.milestones.custom.is_empty() {
            catalog.milestones = config.milestones.custom.clone();
        }
        catalog
    }

    /// Look up an achievement definition by id
    pub fn achievement(&self, id: &str) -> Option<&AchievementDef> {
        self.achievements.iter().find(|a| a.id == id)
    }

    /// Check the catalog for entries the engine cannot evaluate
    ///
    /// Returns one message per problem; an empty list means the catalog is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for def in &self.achievements {
            if def.id.trim().is_empty() {
                errors.push(format!("Achievement '{}' has an empty id", def.title));
            }
            if !seen.insert(def.id.as_str()) {
                errors.push(format!("Duplicate achievement id '{}'", def.id));
            }
            if def.title.trim().is_empty() {
                errors.push(format!("Achievement '{}' has an empty title", def.id));
            }
            if def.required_value == 0 {
                errors.push(format!(
                    "Achievement '{}' must have a positive required_value",
                    def.id
                ));
            }
        }

        let mut days_seen = HashSet::new();
        for milestone in &self.milestones {
            if milestone.days == 0 {
                errors.push(format!(
                    "Milestone '{}' must have a positive day count",
                    milestone.name
                ));
            }
            if !days_seen.insert(milestone.days) {
                errors.push(format!("Duplicate milestone for {} days", milestone.days));
            }
        }

        errors
    }
}

fn achievement(
    id: &str,
    category: &str,
    title: &str,
    description: &str,
    icon: &str,
    required_value: u32,
    kind: AchievementKind,
) -> AchievementDef {
    AchievementDef {
        id: id.into(),
        category: category.into(),
        title: title.into(),
        description: description.into(),
        icon: icon.into(),
        required_value,
        kind,
    }
}

fn build_default_achievements() -> Vec<AchievementDef> {
    use AchievementKind::{Completion, Streak};

    vec![
        // ====================================================================
        // Streaks
        // ====================================================================
        achievement("streak_3", "streaks", "Warming Up", "Keep a 3-day streak", "🔥", 3, Streak),
        achievement("streak_7", "streaks", "On a Roll", "Keep a 7-day streak", "🌟", 7, Streak),
        achievement("streak_30", "streaks", "Unstoppable", "Keep a 30-day streak", "🏆", 30, Streak),
        achievement("streak_100", "streaks", "Legendary", "Keep a 100-day streak", "👑", 100, Streak),
        // ====================================================================
        // Completions
        // ====================================================================
        achievement("first_step", "completions", "First Step", "Complete a habit for the first time", "👣", 1, Completion),
        achievement("ten_done", "completions", "Getting Started", "Complete 10 habits", "✅", 10, Completion),
        achievement("fifty_done", "completions", "Dedicated", "Complete 50 habits", "💪", 50, Completion),
        achievement("century", "completions", "Century", "Complete 100 habits", "💯", 100, Completion),
        achievement("five_hundred", "completions", "Habit Machine", "Complete 500 habits", "🚀", 500, Completion),
    ]
}

fn build_default_milestones() -> Vec<Milestone> {
    vec![
        Milestone::new(7, "Week Warrior", "🌟"),
        Milestone::new(30, "Monthly Master", "🏆"),
        Milestone::new(100, "Century Champion", "👑"),
    ]
}
