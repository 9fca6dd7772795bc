//! Streak milestone badges.

use crate::Milestone;

/// The first unachieved milestone and how far the streak has come toward it
#[derive(Clone, Debug, PartialEq)]
pub struct NextMilestone {
    pub milestone: Milestone,
    /// Percentage toward the milestone, `0.0..=100.0`
    pub percent: f64,
}

/// Mark each milestone achieved when the streak has reached its length
///
/// Order is preserved and nothing is remembered between calls.
pub fn match_milestones(current_streak: u32, milestones: &[Milestone]) -> Vec<Milestone> {
    milestones
        .iter()
        .map(|m| Milestone {
            achieved: current_streak >= m.days,
            ..m.clone()
        })
        .collect()
}

/// The next badge the user is working toward, if any remain
pub fn next_milestone(current_streak: u32, milestones: &[Milestone]) -> Option<NextMilestone> {
    match_milestones(current_streak, milestones)
        .into_iter()
        .find(|m| !m.achieved)
        .map(|m| {
            let percent = if m.days == 0 {
                100.0
            } else {
                (f64::from(current_streak) / f64::from(m.days) * 100.0).min(100.0)
            };
            NextMilestone {
                milestone: m,
                percent,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milestones() -> Vec<Milestone> {
        vec![
            Milestone::new(7, "Week Warrior", "*"),
            Milestone::new(30, "Monthly Master", "#"),
        ]
    }

    #[test]
    fn test_match_milestones() {
        let matched = match_milestones(10, &milestones());
        assert!(matched[0].achieved);
        assert!(!matched[1].achieved);
        assert_eq!(matched[0].name, "Week Warrior");
        assert_eq!(matched[1].name, "Monthly Master");
    }

    #[test]
    fn test_match_recomputes_from_scratch() {
        let achieved = match_milestones(40, &milestones());
        let rematched = match_milestones(0, &achieved);
        assert!(rematched.iter().all(|m| !m.achieved));
    }

    #[test]
    fn test_next_milestone_progress() {
        let next = next_milestone(10, &milestones()).unwrap();
        assert_eq!(next.milestone.days, 30);
        assert!((next.percent - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_next_milestone_none_when_all_achieved() {
        assert!(next_milestone(30, &milestones()).is_none());
    }
}
