//! XP and level arithmetic.
//!
//! Completing a habit awards XP, un-completing takes it back. Levels are
//! derived by repeatedly paying `level * xp_per_level` out of the XP pool.

use crate::XpLevel;

/// XP rules applied to completion deltas
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XpPolicy {
    /// XP awarded per completion (and removed per un-completion)
    pub completion_reward: i64,
    /// Base cost of a level; level `n` costs `n * xp_per_level`
    pub xp_per_level: i64,
    /// Floor XP at zero when un-completions would push it negative
    pub clamp_at_zero: bool,
}

impl Default for XpPolicy {
    fn default() -> Self {
        Self {
            completion_reward: 10,
            xp_per_level: 100,
            clamp_at_zero: true,
        }
    }
}

impl XpPolicy {
    /// Delta for marking (`true`) or un-marking (`false`) a completion
    pub fn delta(&self, completed: bool) -> i64 {
        if completed {
            self.completion_reward
        } else {
            -self.completion_reward
        }
    }
}

/// Apply an XP delta without touching the level
pub fn apply_completion_delta(current: XpLevel, delta: i64, policy: &XpPolicy) -> XpLevel {
    let mut xp = current.xp.saturating_add(delta);
    if policy.clamp_at_zero && xp < 0 {
        tracing::debug!("Clamping XP at zero (would have been {})", xp);
        xp = 0;
    }
    XpLevel {
        xp,
        level: current.level,
    }
}

/// Promote levels until `xp < level * xp_per_level`
///
/// Levels never go down. A non-positive `xp_per_level` leaves the state
/// untouched.
pub fn check_level_up(state: XpLevel, xp_per_level: i64) -> XpLevel {
    if xp_per_level <= 0 {
        tracing::warn!("Ignoring level check with xp_per_level {}", xp_per_level);
        return state;
    }

    let mut next = XpLevel {
        xp: state.xp,
        level: state.level.max(1),
    };

    while next.xp >= threshold(next.level, xp_per_level) {
        next.xp -= threshold(next.level, xp_per_level);
        next.level += 1;
        tracing::info!("Level up! Now level {}", next.level);
    }

    next
}

/// XP still needed before the next level
pub fn xp_to_next_level(state: XpLevel, xp_per_level: i64) -> i64 {
    (threshold(state.level, xp_per_level) - state.xp).max(0)
}

/// Fraction of the current level completed, in `0.0..=1.0`
pub fn level_progress(state: XpLevel, xp_per_level: i64) -> f64 {
    let needed = threshold(state.level, xp_per_level);
    if needed <= 0 {
        return 1.0;
    }
    (state.xp.max(0) as f64 / needed as f64).clamp(0.0, 1.0)
}

fn threshold(level: u32, xp_per_level: i64) -> i64 {
    i64::from(level).saturating_mul(xp_per_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(xp: i64, level: u32) -> XpLevel {
        XpLevel { xp, level }
    }

    #[test]
    fn test_completion_adds_reward() {
        let policy = XpPolicy::default();
        let next = apply_completion_delta(state(40, 1), policy.delta(true), &policy);
        assert_eq!(next, state(50, 1));
    }

    #[test]
    fn test_delta_roundtrip_restores_state() {
        let policy = XpPolicy::default();
        let start = state(40, 2);
        let up = apply_completion_delta(start, policy.delta(true), &policy);
        let back = apply_completion_delta(up, policy.delta(false), &policy);
        assert_eq!(back, start);
    }

    #[test]
    fn test_uncomplete_clamps_xp_at_zero() {
        let policy = XpPolicy::default();
        let next = apply_completion_delta(state(5, 1), policy.delta(false), &policy);
        assert_eq!(next.xp, 0);
    }

    #[test]
    fn test_unclamped_policy_allows_negative_xp() {
        let policy = XpPolicy {
            clamp_at_zero: false,
            ..XpPolicy::default()
        };
        let next = apply_completion_delta(state(5, 1), policy.delta(false), &policy);
        assert_eq!(next.xp, -5);
        assert_eq!(check_level_up(next, policy.xp_per_level), next);
    }

    #[test]
    fn test_level_up_stops_at_next_threshold() {
        // 250 >= 100 -> level 2 with 150; 150 < 200 so it stops
        let next = check_level_up(state(250, 1), 100);
        assert_eq!(next, state(150, 2));
    }

    #[test]
    fn test_level_up_multiple_levels() {
        // 100 + 200 + 300 = 600 -> level 4 with 50 left
        let next = check_level_up(state(650, 1), 100);
        assert_eq!(next, state(50, 4));
    }

    #[test]
    fn test_level_up_exact_threshold() {
        let next = check_level_up(state(100, 1), 100);
        assert_eq!(next, state(0, 2));
    }

    #[test]
    fn test_no_level_up_below_threshold() {
        let next = check_level_up(state(99, 1), 100);
        assert_eq!(next, state(99, 1));
    }

    #[test]
    fn test_level_up_invariant_holds() {
        for xp in (0..2000).step_by(37) {
            let next = check_level_up(state(xp, 1), 100);
            assert!(next.xp < i64::from(next.level) * 100);
        }
    }

    #[test]
    fn test_xp_to_next_level_and_progress() {
        let s = state(150, 2);
        assert_eq!(xp_to_next_level(s, 100), 50);
        assert!((level_progress(s, 100) - 0.75).abs() < 1e-9);
    }
}
