//! Shared constants used across the application.

/// Base URL of the Twitter v1.1 REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com/1.1";

/// Largest `count` the user timeline endpoint accepts per page.
pub const MAX_PAGE_SIZE: u32 = 200;

/// User agent sent with every API request.
pub const USER_AGENT: &str = concat!("tweet-retention/", env!("CARGO_PKG_VERSION"));

/// Timestamp format used by the v1.1 API, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Timestamp format written to the ledgers.
pub const LEDGER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column headers shared by the deleted and saved ledgers.
pub const LEDGER_HEADER: [&str; 7] = [
    "id",
    "date",
    "text",
    "user.id",
    "user.screen_name",
    "favorite_count",
    "retweet_count",
];
