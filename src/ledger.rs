//! Run-scoped record of every decision taken.

use serde::Serialize;

use crate::constants::LEDGER_DATE_FORMAT;
use crate::twitter::Post;

/// Flattened post as written to the ledgers. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionRecord {
    pub id: String,
    pub date: String,
    pub text: String,
    pub author_id: String,
    pub author_handle: String,
    pub favorite_count: u64,
    pub retweet_count: u64,
}

impl From<&Post> for DecisionRecord {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            date: post.created_at.format(LEDGER_DATE_FORMAT).to_string(),
            text: post.text.clone(),
            author_id: post.author_id.clone(),
            author_handle: post.author_handle.clone(),
            favorite_count: post.favorite_count,
            retweet_count: post.retweet_count,
        }
    }
}

/// A post the run intended to delete but the service did not confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDeletion {
    pub record: DecisionRecord,
    pub error: String,
}

/// The deleted and saved ledgers plus their running totals.
///
/// `deleted` records intent: a post lands there as soon as it is classified
/// for deletion. Live deletions the service rejected are additionally listed
/// in `failed`.
#[derive(Debug, Default)]
pub struct Ledger {
    deleted: Vec<DecisionRecord>,
    saved: Vec<DecisionRecord>,
    failed: Vec<FailedDeletion>,
    deleted_count: u64,
    saved_count: u64,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deleted(&mut self, post: &Post) {
        self.deleted.push(DecisionRecord::from(post));
        self.deleted_count += 1;
    }

    pub fn record_saved(&mut self, post: &Post) {
        self.saved.push(DecisionRecord::from(post));
        self.saved_count += 1;
    }

    pub fn record_failed_deletion(&mut self, post: &Post, error: impl Into<String>) {
        self.failed.push(FailedDeletion {
            record: DecisionRecord::from(post),
            error: error.into(),
        });
    }

    #[must_use]
    pub fn deleted(&self) -> &[DecisionRecord] {
        &self.deleted
    }

    #[must_use]
    pub fn saved(&self) -> &[DecisionRecord] {
        &self.saved
    }

    #[must_use]
    pub fn failed(&self) -> &[FailedDeletion] {
        &self.failed
    }

    #[must_use]
    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }

    #[must_use]
    pub fn saved_count(&self) -> u64 {
        self.saved_count
    }

    #[must_use]
    pub fn processed(&self) -> u64 {
        self.deleted_count + self.saved_count
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2020, 2, 3, 4, 5, 6).unwrap(),
            text: "some, text \"quoted\"".to_string(),
            author_id: "99".to_string(),
            author_handle: "handle".to_string(),
            favorite_count: 2,
            retweet_count: 1,
            source: "web".to_string(),
        }
    }

    #[test]
    fn test_record_flattens_post() {
        let record = DecisionRecord::from(&post("7"));
        assert_eq!(record.id, "7");
        assert_eq!(record.date, "2020-02-03 04:05:06");
        assert_eq!(record.author_id, "99");
        assert_eq!(record.author_handle, "handle");
        assert_eq!(record.favorite_count, 2);
        assert_eq!(record.retweet_count, 1);
    }

    #[test]
    fn test_counters_track_sequences() {
        let mut ledger = Ledger::new();
        ledger.record_deleted(&post("1"));
        ledger.record_saved(&post("2"));
        ledger.record_saved(&post("3"));

        assert_eq!(ledger.deleted_count(), 1);
        assert_eq!(ledger.saved_count(), 2);
        assert_eq!(ledger.processed(), 3);
        assert_eq!(ledger.deleted().len() as u64, ledger.deleted_count());
        assert_eq!(ledger.saved().len() as u64, ledger.saved_count());
        let saved_ids: Vec<&str> = ledger.saved().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(saved_ids, vec!["2", "3"]);
    }

    #[test]
    fn test_failed_deletion_does_not_touch_counters() {
        let mut ledger = Ledger::new();
        let p = post("1");
        ledger.record_deleted(&p);
        ledger.record_failed_deletion(&p, "status 404");

        assert_eq!(ledger.deleted_count(), 1);
        assert_eq!(ledger.processed(), 1);
        assert_eq!(ledger.failed().len(), 1);
        assert_eq!(ledger.failed()[0].error, "status 404");
    }
}
