//! Retention policy and the delete/keep predicate.

use chrono::{DateTime, Duration, Utc};

use crate::constants::LEDGER_DATE_FORMAT;
use crate::twitter::Post;

/// Conjunctive retention thresholds. An unset threshold does not constrain the
/// decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Posts newer than this many days are kept.
    pub cutoff_days: Option<u32>,
    /// Posts with at least this many favorites are kept.
    pub fav_min: Option<u64>,
    /// Posts with at least this many reposts are kept.
    pub rt_min: Option<u64>,
}

impl RetentionPolicy {
    /// Build a policy, treating a zero engagement threshold as unset.
    #[must_use]
    pub fn new(cutoff_days: Option<u32>, fav_min: Option<u64>, rt_min: Option<u64>) -> Self {
        Self {
            cutoff_days,
            fav_min: fav_min.filter(|&n| n > 0),
            rt_min: rt_min.filter(|&n| n > 0),
        }
    }

    /// Posts created at or before this instant pass the age check.
    ///
    /// `None` when no cutoff is set, or when the cutoff lies before the
    /// earliest representable date.
    #[must_use]
    pub fn cutoff_date(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cutoff_days
            .and_then(|days| now.checked_sub_signed(Duration::days(i64::from(days))))
    }

    /// Whether `post` should be deleted, evaluated against a fixed `now`.
    #[must_use]
    pub fn evaluate(&self, post: &Post, now: DateTime<Utc>) -> bool {
        // A cutoff too far back to represent is older than every post.
        let age_ok = match self.cutoff_days {
            None => true,
            Some(_) => self
                .cutoff_date(now)
                .is_some_and(|cutoff| post.created_at <= cutoff),
        };
        let fav_ok = self.fav_min.map_or(true, |min| post.favorite_count < min);
        let rt_ok = self.rt_min.map_or(true, |min| post.retweet_count < min);

        age_ok && fav_ok && rt_ok
    }

    /// Human-readable deletion criteria, for verbose output.
    #[must_use]
    pub fn describe(&self, now: DateTime<Utc>) -> String {
        let mut parts = Vec::new();
        match (self.cutoff_days, self.cutoff_date(now)) {
            (Some(_), Some(cutoff)) => parts.push(format!(
                "created before {}",
                cutoff.format(LEDGER_DATE_FORMAT)
            )),
            (Some(days), None) => parts.push(format!("older than {days} day(s)")),
            (None, _) => parts.push("any age".to_string()),
        }
        if let Some(min) = self.fav_min {
            parts.push(format!("fewer than {min} like(s)"));
        }
        if let Some(min) = self.rt_min {
            parts.push(format!("fewer than {min} RT(s)"));
        }
        format!("delete if {}", parts.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn post_aged(days: i64, favorites: u64, retweets: u64) -> Post {
        Post {
            id: "1".to_string(),
            created_at: now() - Duration::days(days),
            text: "hello".to_string(),
            author_id: "42".to_string(),
            author_handle: "someone".to_string(),
            favorite_count: favorites,
            retweet_count: retweets,
            source: "web".to_string(),
        }
    }

    #[test]
    fn test_old_unengaged_post_is_deleted() {
        let policy = RetentionPolicy::new(Some(365), Some(1), Some(1));
        assert!(policy.evaluate(&post_aged(400, 0, 0), now()));
    }

    #[test]
    fn test_only_age_constrains_without_engagement_thresholds() {
        let policy = RetentionPolicy::new(Some(365), None, None);
        assert!(policy.evaluate(&post_aged(400, 0, 0), now()));
        assert!(policy.evaluate(&post_aged(400, 1_000, 1_000), now()));
    }

    #[test]
    fn test_recent_post_is_saved_regardless_of_engagement() {
        let policy = RetentionPolicy::new(Some(365), Some(1), Some(1));
        for (favs, rts) in [(0, 0), (100, 0), (0, 100), (100, 100)] {
            assert!(!policy.evaluate(&post_aged(10, favs, rts), now()));
        }
    }

    #[test]
    fn test_enough_favorites_blocks_deletion() {
        let policy = RetentionPolicy::new(Some(365), Some(3), None);
        assert!(!policy.evaluate(&post_aged(400, 5, 0), now()));
        assert!(!policy.evaluate(&post_aged(400, 3, 0), now()));
        assert!(policy.evaluate(&post_aged(400, 2, 0), now()));
    }

    #[test]
    fn test_enough_reposts_blocks_deletion() {
        let policy = RetentionPolicy::new(Some(365), None, Some(2));
        assert!(!policy.evaluate(&post_aged(400, 0, 2), now()));
        assert!(policy.evaluate(&post_aged(400, 0, 1), now()));
    }

    #[test]
    fn test_cutoff_boundary_is_inclusive() {
        let policy = RetentionPolicy::new(Some(365), None, None);
        assert!(policy.evaluate(&post_aged(365, 0, 0), now()));
        let mut just_inside = post_aged(365, 0, 0);
        just_inside.created_at += Duration::seconds(1);
        assert!(!policy.evaluate(&just_inside, now()));
    }

    #[test]
    fn test_age_alone_decides_when_thresholds_unset() {
        let policy = RetentionPolicy::new(Some(30), None, None);
        for days in [0, 1, 29, 30, 31, 365, 4000] {
            for (favs, rts) in [(0, 0), (7, 0), (0, 9), (50, 50)] {
                let post = post_aged(days, favs, rts);
                assert_eq!(policy.evaluate(&post, now()), days >= 30, "days={days}");
            }
        }
    }

    #[test]
    fn test_unset_cutoff_does_not_block() {
        let policy = RetentionPolicy::new(None, Some(2), None);
        assert!(policy.evaluate(&post_aged(0, 1, 0), now()));
        assert!(!policy.evaluate(&post_aged(0, 2, 0), now()));
        assert!(RetentionPolicy::default().evaluate(&post_aged(0, 9, 9), now()));
    }

    #[test]
    fn test_zero_thresholds_are_unset() {
        let policy = RetentionPolicy::new(Some(1), Some(0), Some(0));
        assert_eq!(policy.fav_min, None);
        assert_eq!(policy.rt_min, None);
        assert!(policy.evaluate(&post_aged(5, 3, 3), now()));
    }

    #[test]
    fn test_fav_min_is_monotonic() {
        // Raising fav_min can only make a post eligible, never the reverse.
        for favorites in [0, 1, 4, 9] {
            let post = post_aged(400, favorites, 0);
            let mut was_deletable = false;
            for fav_min in 1..12 {
                let policy = RetentionPolicy::new(Some(365), Some(fav_min), None);
                let deletable = policy.evaluate(&post, now());
                assert!(!was_deletable || deletable, "favorites={favorites} fav_min={fav_min}");
                was_deletable = deletable;
            }
        }
    }

    #[test]
    fn test_evaluate_is_repeatable() {
        let policy = RetentionPolicy::new(Some(365), Some(2), Some(2));
        for post in [post_aged(400, 0, 0), post_aged(10, 0, 0), post_aged(400, 5, 0)] {
            assert_eq!(policy.evaluate(&post, now()), policy.evaluate(&post, now()));
        }
    }

    #[test]
    fn test_huge_cutoff_keeps_everything() {
        let policy = RetentionPolicy::new(Some(100_000_000), None, None);
        assert_eq!(policy.cutoff_date(now()), None);
        assert!(!policy.evaluate(&post_aged(0, 0, 0), now()));
        assert!(!policy.evaluate(&post_aged(100_000, 0, 0), now()));
        assert_eq!(policy.describe(now()), "delete if older than 100000000 day(s)");

        let max = RetentionPolicy::new(Some(u32::MAX), None, None);
        assert!(!max.evaluate(&post_aged(400, 0, 0), now()));
    }

    #[test]
    fn test_describe() {
        let policy = RetentionPolicy::new(Some(1), Some(2), Some(3));
        assert_eq!(
            policy.describe(now()),
            "delete if created before 2024-05-31 12:00:00 AND fewer than 2 like(s) AND fewer than 3 RT(s)"
        );
        assert_eq!(RetentionPolicy::default().describe(now()), "delete if any age");
    }
}
