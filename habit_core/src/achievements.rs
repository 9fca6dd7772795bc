//! Achievement evaluation.
//!
//! Progress is recomputed from scratch on every call, but `achieved` is
//! sticky: once a user has earned an achievement it stays earned even if
//! the streak later breaks.

use crate::{
    AchievementDef, AchievementKind, AchievementProgressMap, StreakStats,
    UserAchievementProgress,
};
use chrono::{DateTime, Utc};

/// Evaluate every catalog entry for a user
///
/// Records missing from `existing` are created with zero progress.
/// `TimeBased` and `Milestone` kinds have no progress rule yet and pass
/// through unchanged. Records for achievements not in the catalog are kept.
pub fn evaluate(
    user_id: &str,
    catalog: &[AchievementDef],
    streak_stats: &StreakStats,
    completion_count: u32,
    existing: &AchievementProgressMap,
    now: DateTime<Utc>,
) -> AchievementProgressMap {
    let mut updated = existing.clone();

    for def in catalog {
        let prior = updated
            .remove(&def.id)
            .unwrap_or_else(|| UserAchievementProgress::new(user_id, def.id.clone()));

        let progress = match def.kind {
            AchievementKind::Streak => streak_stats.current_streak,
            AchievementKind::Completion => completion_count,
            AchievementKind::TimeBased | AchievementKind::Milestone => {
                updated.insert(def.id.clone(), prior);
                continue;
            }
        };

        updated.insert(def.id.clone(), merge(prior, def, progress, now));
    }

    updated
}

/// Fold fresh progress into a prior record, keeping `achieved` monotonic
fn merge(
    prior: UserAchievementProgress,
    def: &AchievementDef,
    progress: u32,
    now: DateTime<Utc>,
) -> UserAchievementProgress {
    let reached = progress >= def.required_value;
    let achieved = prior.achieved || reached;

    let achieved_at = if achieved && !prior.achieved {
        tracing::info!("Achievement unlocked: {} ({})", def.title, def.id);
        Some(now)
    } else {
        prior.achieved_at
    };

    UserAchievementProgress {
        progress,
        achieved,
        achieved_at,
        ..prior
    }
}

/// Achievement ids that flipped to achieved between two evaluations
///
/// Sorted for stable output.
pub fn newly_unlocked(
    before: &AchievementProgressMap,
    after: &AchievementProgressMap,
) -> Vec<String> {
    let mut ids: Vec<String> = after
        .values()
        .filter(|p| p.achieved)
        .filter(|p| !before.get(&p.achievement_id).is_some_and(|b| b.achieved))
        .map(|p| p.achievement_id.clone())
        .collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn def(id: &str, kind: AchievementKind, required_value: u32) -> AchievementDef {
        AchievementDef {
            id: id.into(),
            category: "test".into(),
            title: id.into(),
            description: String::new(),
            icon: "*".into(),
            required_value,
            kind,
        }
    }

    fn streak(current: u32) -> StreakStats {
        StreakStats {
            current_streak: current,
            longest_streak: current,
            last_completed_date: None,
        }
    }

    #[test]
    fn test_missing_records_are_created() {
        let catalog = vec![
            def("streak_7", AchievementKind::Streak, 7),
            def("first", AchievementKind::Completion, 1),
        ];

        let result = evaluate("alice", &catalog, &streak(0), 0, &Default::default(), Utc::now());

        assert_eq!(result.len(), 2);
        let record = &result["streak_7"];
        assert_eq!(record.user_id, "alice");
        assert_eq!(record.progress, 0);
        assert!(!record.achieved);
        assert!(record.achieved_at.is_none());
    }

    #[test]
    fn test_streak_achievement_is_sticky() {
        let catalog = vec![def("streak_7", AchievementKind::Streak, 7)];
        let t1 = Utc::now();

        let first = evaluate("alice", &catalog, &streak(7), 0, &Default::default(), t1);
        assert!(first["streak_7"].achieved);
        assert_eq!(first["streak_7"].achieved_at, Some(t1));

        let t2 = t1 + Duration::days(3);
        let second = evaluate("alice", &catalog, &streak(3), 0, &first, t2);
        let record = &second["streak_7"];
        assert_eq!(record.progress, 3);
        assert!(record.achieved);
        assert_eq!(record.achieved_at, Some(t1));
    }

    #[test]
    fn test_completion_progress_uses_count() {
        let catalog = vec![def("ten", AchievementKind::Completion, 10)];

        let result = evaluate("alice", &catalog, &streak(0), 9, &Default::default(), Utc::now());
        assert_eq!(result["ten"].progress, 9);
        assert!(!result["ten"].achieved);

        let result = evaluate("alice", &catalog, &streak(0), 10, &result, Utc::now());
        assert!(result["ten"].achieved);
    }

    #[test]
    fn test_time_based_and_milestone_pass_through() {
        let catalog = vec![
            def("early", AchievementKind::TimeBased, 5),
            def("badge", AchievementKind::Milestone, 2),
        ];
        let mut existing = AchievementProgressMap::new();
        let mut prior = UserAchievementProgress::new("alice", "early");
        prior.progress = 4;
        existing.insert("early".into(), prior.clone());

        let result = evaluate("alice", &catalog, &streak(50), 50, &existing, Utc::now());

        assert_eq!(result["early"], prior);
        assert_eq!(result["badge"].progress, 0);
        assert!(!result["badge"].achieved);
    }

    #[test]
    fn test_unknown_records_are_preserved() {
        let mut existing = AchievementProgressMap::new();
        existing.insert("retired".into(), UserAchievementProgress::new("alice", "retired"));

        let result = evaluate("alice", &[], &streak(1), 1, &existing, Utc::now());
        assert!(result.contains_key("retired"));
    }

    #[test]
    fn test_newly_unlocked_lists_transitions_only() {
        let catalog = vec![
            def("first", AchievementKind::Completion, 1),
            def("ten", AchievementKind::Completion, 10),
        ];

        let before = evaluate("alice", &catalog, &streak(0), 1, &Default::default(), Utc::now());
        assert_eq!(newly_unlocked(&Default::default(), &before), vec!["first".to_string()]);

        let after = evaluate("alice", &catalog, &streak(0), 10, &before, Utc::now());
        assert_eq!(newly_unlocked(&before, &after), vec!["ten".to_string()]);
    }
}
