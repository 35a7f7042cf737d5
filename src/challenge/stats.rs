use std::collections::BTreeSet;

use crate::models::DerivedStats;

/// Consecutive completed days counting down from the highest completed day.
///
/// The run is anchored at the user's highest completed day, not at today:
/// {5, 40} yields 1 no matter how long ago day 40 opened.
pub fn current_streak(completed: &BTreeSet<u32>) -> u32 {
    debug_assert!(!completed.contains(&0), "challenge days start at 1");
    let Some(&highest) = completed.last() else {
        return 0;
    };
    let mut streak = 0;
    let mut day = highest;
    while day >= 1 && completed.contains(&day) {
        streak += 1;
        day -= 1;
    }
    streak
}

pub fn derive_stats(completed: &BTreeSet<u32>, unlocked_day_count: u32) -> DerivedStats {
    let completed_count = completed.len() as u32;
    let percent_complete = if unlocked_day_count > 0 {
        completed_count as f64 / unlocked_day_count as f64
    } else {
        0.0
    };
    DerivedStats {
        unlocked_day_count,
        completed_count,
        current_streak: current_streak(completed),
        percent_complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(days: &[u32]) -> BTreeSet<u32> {
        days.iter().copied().collect()
    }

    #[test]
    fn streak_counts_run_ending_at_highest_day() {
        assert_eq!(current_streak(&set(&[3, 4, 5])), 3);
        assert_eq!(current_streak(&set(&[3, 4, 6])), 1);
        assert_eq!(current_streak(&set(&[])), 0);
        assert_eq!(current_streak(&set(&[1, 2, 3, 4])), 4);
    }

    #[test]
    fn streak_ignores_older_runs() {
        assert_eq!(current_streak(&set(&[1, 2, 3, 4, 5, 40])), 1);
        assert_eq!(current_streak(&set(&[1, 2, 3, 10, 11])), 2);
    }

    #[test]
    fn percent_is_ratio_of_unlocked() {
        let stats = derive_stats(&set(&[1, 2, 3, 4]), 10);
        assert_eq!(stats.completed_count, 4);
        assert!((stats.percent_complete - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn nothing_unlocked_means_zero_percent() {
        let stats = derive_stats(&set(&[1, 2]), 0);
        assert_eq!(stats.percent_complete, 0.0);
        assert_eq!(stats.unlocked_day_count, 0);
        assert_eq!(stats.current_streak, 2);
    }
}
