//! Twitter v1.1 API session: OAuth handshake, paginated timeline, delete.

pub mod models;
pub mod oauth;

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::Stream;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{Credentials, Settings};
use crate::constants::USER_AGENT;
use crate::error::{Error, Result};
pub use models::{Account, Post, Status};
use oauth::Nonce;

/// The minimal capability set a retention run needs from the remote service.
#[async_trait]
pub trait TimelineService: Send + Sync {
    /// Fetch one page of the user's posts, newest first, with ids `<= max_id`.
    /// An empty page means the timeline is exhausted.
    async fn fetch_page(&self, max_id: Option<u64>) -> Result<Vec<Post>>;

    /// Delete a single post by id.
    async fn delete_post(&self, id: &str) -> Result<()>;
}

/// How often a failed page fetch is retried before the stream gives up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }
}

impl From<&Settings> for RetryPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            retries: settings.page_retries,
            backoff: settings.retry_backoff,
        }
    }
}

/// Stream the service's timeline page by page.
///
/// Forward-only: the cursor moves to `lowest id - 1` after each page and the
/// stream ends on the first empty page. Posts above the cursor are dropped, so
/// each post is yielded at most once. A page that still fails after the
/// retry budget yields a single error and ends the stream.
pub fn stream_timeline<'a, S>(
    service: &'a S,
    retry: RetryPolicy,
) -> impl Stream<Item = Result<Post>> + 'a
where
    S: TimelineService + ?Sized,
{
    stream! {
        let mut max_id: Option<u64> = None;
        let mut page_number = 0u32;

        loop {
            page_number += 1;
            let page = match fetch_with_retry(service, max_id, retry).await {
                Ok(page) => page,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            };

            if page.is_empty() {
                debug!(page = page_number, "Timeline exhausted");
                break;
            }
            debug!(page = page_number, posts = page.len(), "Fetched timeline page");

            let lowest = page.iter().filter_map(Post::numeric_id).min();
            for post in page {
                // Posts above the cursor were already yielded from an earlier page.
                if let (Some(cursor), Some(id)) = (max_id, post.numeric_id()) {
                    if id > cursor {
                        debug!(id = %post.id, max_id = cursor, "Skipping post above cursor");
                        continue;
                    }
                }
                yield Ok(post);
            }

            let next = match lowest {
                Some(id) if id > 0 => id - 1,
                _ => break,
            };
            if max_id.is_some_and(|prev| next >= prev) {
                warn!(max_id = ?max_id, next, "Timeline cursor did not advance, stopping");
                break;
            }
            max_id = Some(next);
        }
    }
}

async fn fetch_with_retry<S>(service: &S, max_id: Option<u64>, retry: RetryPolicy) -> Result<Vec<Post>>
where
    S: TimelineService + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        match service.fetch_page(max_id).await {
            Ok(page) => return Ok(page),
            Err(e @ Error::Transport { .. }) if attempt < retry.retries => {
                let delay = retry.backoff.saturating_mul(2u32.saturating_pow(attempt));
                attempt += 1;
                warn!(attempt, max_id = ?max_id, delay = ?delay, "Timeline page fetch failed, retrying: {e}");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// An authenticated API session, held for the lifetime of a run.
pub struct TwitterSession {
    client: Client,
    credentials: Credentials,
    base_url: String,
    page_size: u32,
    account: Account,
}

impl TwitterSession {
    /// Exchange credentials for a verified session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the service rejects the credentials, or
    /// [`Error::Transport`] if it cannot be reached.
    pub async fn authenticate(credentials: Credentials, settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::transport("Failed to build HTTP client", e))?;

        let base_url = settings.api_base_url.trim_end_matches('/').to_string();
        debug!(base_url = %base_url, access_level = %credentials.access_level, "Verifying credentials");

        let url = format!("{base_url}/account/verify_credentials.json");
        let response = signed_request(&client, &credentials, "GET", &url, &[])
            .await
            .map_err(|e| Error::transport("Failed to reach credentials endpoint", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(
                format!("Credential check failed with status {status}"),
                api_error_message(&body),
            ));
        }

        let account: Account = response
            .json()
            .await
            .map_err(|e| Error::transport("Failed to parse credentials response", e))?;

        info!(screen_name = %account.screen_name, user_id = %account.id_str, "API authenticated");

        Ok(Self {
            client,
            credentials,
            base_url,
            page_size: settings.page_size,
            account,
        })
    }

    /// The account the credentials belong to.
    #[must_use]
    pub fn account(&self) -> &Account {
        &self.account
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl TimelineService for TwitterSession {
    async fn fetch_page(&self, max_id: Option<u64>) -> Result<Vec<Post>> {
        let url = self.endpoint("statuses/user_timeline.json");
        let mut params = vec![
            ("count", self.page_size.to_string()),
            ("tweet_mode", "extended".to_string()),
        ];
        if let Some(max_id) = max_id {
            params.push(("max_id", max_id.to_string()));
        }

        let response = signed_request(&self.client, &self.credentials, "GET", &url, &params)
            .await
            .map_err(|e| Error::transport("Failed to fetch timeline page", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(
                format!("Timeline fetch failed with status {status}"),
                api_error_message(&body),
            ));
        }

        let statuses: Vec<Status> = response
            .json()
            .await
            .map_err(|e| Error::transport("Failed to parse timeline page", e))?;

        statuses.into_iter().map(Post::try_from).collect()
    }

    async fn delete_post(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("statuses/destroy/{}.json", urlencoding::encode(id)));

        let response = signed_request(&self.client, &self.credentials, "POST", &url, &[])
            .await
            .map_err(|e| Error::Delete {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Delete {
            id: id.to_string(),
            message: format!("status {status}: {}", api_error_message(&body)),
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum RequestError {
    #[error("failed to sign request: {0}")]
    Sign(hmac::digest::InvalidLength),
    #[error(transparent)]
    Send(#[from] reqwest::Error),
}

/// Send an OAuth-signed request. Parameters travel in the query string for
/// both methods, which keeps the signature base and the wire identical.
async fn signed_request(
    client: &Client,
    credentials: &Credentials,
    method: &str,
    url: &str,
    params: &[(&str, String)],
) -> std::result::Result<Response, RequestError> {
    let header = oauth::authorization_header(credentials, method, url, params, &Nonce::generate())
        .map_err(RequestError::Sign)?;
    let full_url = if params.is_empty() {
        url.to_string()
    } else {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{url}?{query}")
    };

    let builder = if method == "POST" {
        client.post(&full_url)
    } else {
        client.get(&full_url)
    };
    builder
        .header(reqwest::header::AUTHORIZATION, header)
        .send()
        .await
        .map_err(RequestError::from)
}

#[derive(Debug, Deserialize)]
struct ApiErrors {
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    code: Option<i64>,
    message: String,
}

/// Pull the first `errors[].message` out of an API error body, falling back to
/// the raw body.
fn api_error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrors>(body) {
        if let Some(first) = parsed.errors.first() {
            return match first.code {
                Some(code) => format!("{} (code {code})", first.message),
                None => first.message.clone(),
            };
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
