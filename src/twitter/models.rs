use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::constants::TWITTER_DATE_FORMAT;
use crate::error::{Error, Result};

/// A status as returned by `statuses/user_timeline.json`.
///
/// Everything is optional so that a missing field is reported by name when the
/// status is converted into a [`Post`].
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id_str: Option<String>,
    pub created_at: Option<String>,
    pub text: Option<String>,
    /// Present instead of `text` when requested with `tweet_mode=extended`.
    pub full_text: Option<String>,
    pub user: Option<StatusUser>,
    pub favorite_count: Option<u64>,
    pub retweet_count: Option<u64>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUser {
    pub id_str: Option<String>,
    pub id: Option<u64>,
    pub screen_name: Option<String>,
}

/// Response from `account/verify_credentials.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id_str: String,
    pub screen_name: String,
}

/// A post from the authenticated user's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub author_id: String,
    pub author_handle: String,
    pub favorite_count: u64,
    pub retweet_count: u64,
    pub source: String,
}

impl Post {
    /// Numeric id, used as the pagination cursor.
    #[must_use]
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }
}

impl TryFrom<Status> for Post {
    type Error = Error;

    fn try_from(status: Status) -> Result<Self> {
        let id = status
            .id_str
            .ok_or_else(|| Error::MalformedPost("missing id_str".to_string()))?;
        let missing = |field: &str| Error::MalformedPost(format!("post {id}: missing {field}"));

        let created_raw = status.created_at.ok_or_else(|| missing("created_at"))?;
        let created_at = parse_twitter_date(&created_raw).ok_or_else(|| {
            Error::MalformedPost(format!("post {id}: unparseable created_at '{created_raw}'"))
        })?;
        let text = status
            .full_text
            .or(status.text)
            .ok_or_else(|| missing("text"))?;
        let user = status.user.ok_or_else(|| missing("user"))?;
        let author_id = user
            .id_str
            .or_else(|| user.id.map(|n| n.to_string()))
            .ok_or_else(|| missing("user.id"))?;
        let author_handle = user.screen_name.ok_or_else(|| missing("user.screen_name"))?;
        let favorite_count = status
            .favorite_count
            .ok_or_else(|| missing("favorite_count"))?;
        let retweet_count = status
            .retweet_count
            .ok_or_else(|| missing("retweet_count"))?;

        Ok(Self {
            id,
            created_at,
            text,
            author_id,
            author_handle,
            favorite_count,
            retweet_count,
            source: status.source.unwrap_or_default(),
        })
    }
}

/// Parse the v1.1 `created_at` format, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
#[must_use]
pub fn parse_twitter_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, TWITTER_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
