//! Line-clear points and the score-driven gravity ramp.

use std::time::Duration;

/// Gravity interval at score 0 (and after every reset).
pub const INITIAL_DROP_INTERVAL: Duration = Duration::from_millis(1000);

/// Gravity interval while soft drop is held.
pub const SOFT_DROP_INTERVAL: Duration = Duration::from_millis(100);

/// Points indexed by rows cleared in one lock.
const POINTS_PER_CLEAR: [u32; 5] = [0, 40, 100, 300, 1200];

/// (minimum score, interval ms), fastest first.
const SPEED_TIERS: [(u32, u64); 4] = [(2000, 400), (1500, 500), (1000, 600), (500, 750)];

/// Points for clearing `lines` rows at once. Counts above four score as four.
pub fn points_for(lines: u32) -> u32 {
    let idx = (lines as usize).min(POINTS_PER_CLEAR.len() - 1);
    POINTS_PER_CLEAR[idx]
}

pub fn update_score(score: u32, lines: u32) -> u32 {
    score.saturating_add(points_for(lines))
}

/// Gravity interval for a score; the highest threshold reached wins.
pub fn drop_interval_for(score: u32) -> Duration {
    SPEED_TIERS
        .iter()
        .find(|(min, _)| score >= *min)
        .map_or(INITIAL_DROP_INTERVAL, |&(_, ms)| Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_table() {
        assert_eq!(points_for(0), 0);
        assert_eq!(points_for(1), 40);
        assert_eq!(points_for(2), 100);
        assert_eq!(points_for(3), 300);
        assert_eq!(points_for(4), 1200);
        assert_eq!(points_for(9), 1200);
    }

    #[test]
    fn test_update_score_never_decreases() {
        for start in [0, 1, 499, 1999, u32::MAX - 10] {
            for lines in 0..=4 {
                assert!(update_score(start, lines) >= start);
            }
        }
    }

    #[test]
    fn test_tetris_from_zero() {
        let score = update_score(0, 4);
        assert_eq!(score, 1200);
        assert_eq!(drop_interval_for(score), Duration::from_millis(600));
        assert_eq!(drop_interval_for(update_score(0, 3)), INITIAL_DROP_INTERVAL);
    }

    #[test]
    fn test_speed_tiers() {
        assert_eq!(drop_interval_for(0), Duration::from_millis(1000));
        assert_eq!(drop_interval_for(500), Duration::from_millis(750));
        assert_eq!(drop_interval_for(1000), Duration::from_millis(600));
        assert_eq!(drop_interval_for(1500), Duration::from_millis(500));
        assert_eq!(drop_interval_for(2000), Duration::from_millis(400));
        assert_eq!(drop_interval_for(2100), Duration::from_millis(400));
    }
}
