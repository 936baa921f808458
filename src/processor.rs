//! Retention run orchestration: authenticate, stream, classify, act, report.

use std::path::PathBuf;

use chrono::Utc;
use futures_util::{pin_mut, StreamExt};
use tracing::{debug, info, warn};

use crate::config::{Credentials, Settings};
use crate::constants::LEDGER_DATE_FORMAT;
use crate::error::Result;
use crate::export::{export, ExportPaths};
use crate::ledger::Ledger;
use crate::retention::RetentionPolicy;
use crate::twitter::{stream_timeline, Post, RetryPolicy, TimelineService, TwitterSession};

/// Inputs to a single retention run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub credentials_path: PathBuf,
    pub export_path: PathBuf,
    pub policy: RetentionPolicy,
    /// Classify and report only; never call the delete endpoint.
    pub dry_run: bool,
    /// Log every post and decision at info level.
    pub verbose: bool,
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub deleted: u64,
    pub saved: u64,
    pub failed_deletions: u64,
    pub dry_run: bool,
    pub exported: ExportPaths,
}

/// Record one classified post, deleting it on the service when not a dry run.
///
/// A failed delete is logged and listed in the ledger's `failed` sequence; the
/// post stays in the deleted ledger and the run continues.
pub async fn classify_and_record<S>(
    service: &S,
    ledger: &mut Ledger,
    post: &Post,
    delete: bool,
    dry_run: bool,
) where
    S: TimelineService + ?Sized,
{
    if !delete {
        ledger.record_saved(post);
        return;
    }

    ledger.record_deleted(post);
    if dry_run {
        return;
    }

    match service.delete_post(&post.id).await {
        Ok(()) => debug!(id = %post.id, "Post deleted"),
        Err(e) => {
            warn!(id = %post.id, "Delete failed, continuing: {e}");
            ledger.record_failed_deletion(post, e.to_string());
        }
    }
}

/// Run a full retention pass against an already-authenticated service.
///
/// If the timeline stream fails part-way, whatever was recorded so far is
/// exported before the error is returned.
///
/// # Errors
///
/// Returns the first fatal error from the timeline stream, or an export error.
pub async fn process_timeline<S>(
    service: &S,
    retry: RetryPolicy,
    options: &RunOptions,
) -> Result<RunSummary>
where
    S: TimelineService + ?Sized,
{
    let mut ledger = Ledger::new();
    let now = Utc::now();

    info!(
        dry_run = options.dry_run,
        criteria = %options.policy.describe(now),
        "Processing timeline"
    );

    let timeline = stream_timeline(service, retry);
    pin_mut!(timeline);

    let mut stream_error = None;
    while let Some(item) = timeline.next().await {
        let post = match item {
            Ok(post) => post,
            Err(e) if e.is_fatal() => {
                stream_error = Some(e);
                break;
            }
            Err(e) => {
                warn!("Timeline error, continuing: {e}");
                continue;
            }
        };

        let delete = options.policy.evaluate(&post, now);
        log_post(&post, delete, options);
        classify_and_record(service, &mut ledger, &post, delete, options.dry_run).await;
    }

    if let Some(e) = stream_error {
        warn!(
            processed = ledger.processed(),
            "Timeline stream failed, exporting partial results: {e}"
        );
        if let Err(export_err) = export(&ledger, &options.export_path) {
            warn!("Partial export failed: {export_err}");
        }
        return Err(e);
    }

    let exported = export(&ledger, &options.export_path)?;
    let summary = RunSummary {
        processed: ledger.processed(),
        deleted: ledger.deleted_count(),
        saved: ledger.saved_count(),
        failed_deletions: ledger.failed().len() as u64,
        dry_run: options.dry_run,
        exported,
    };

    info!(
        processed = summary.processed,
        deleted = summary.deleted,
        saved = summary.saved,
        failed_deletions = summary.failed_deletions,
        dry_run = summary.dry_run,
        "Retention run complete"
    );

    Ok(summary)
}

/// Load credentials, authenticate, and run a retention pass.
///
/// # Errors
///
/// Returns a config error before any network activity if the credentials or
/// settings are unusable, an auth error if the service rejects them, and
/// otherwise whatever [`process_timeline`] returns.
pub async fn run(options: &RunOptions, settings: &Settings) -> Result<RunSummary> {
    settings.validate()?;

    debug!(path = %options.credentials_path.display(), "Loading credentials");
    let credentials = Credentials::load(&options.credentials_path)?;

    let session = TwitterSession::authenticate(credentials, settings).await?;
    process_timeline(&session, RetryPolicy::from(settings), options).await
}

fn log_post(post: &Post, delete: bool, options: &RunOptions) {
    let created = post.created_at.format(LEDGER_DATE_FORMAT).to_string();
    if options.verbose {
        info!(
            id = %post.id,
            source = %post.source,
            created = %created,
            favorites = post.favorite_count,
            retweets = post.retweet_count,
            delete,
            dry_run = options.dry_run,
            text = %post.text,
            "Processed post"
        );
    } else {
        debug!(id = %post.id, created = %created, delete, "Processed post");
    }
}

impl RunSummary {
    /// Deletions the service confirmed. Zero for dry runs.
    #[must_use]
    pub fn confirmed_deletions(&self) -> u64 {
        if self.dry_run {
            0
        } else {
            self.deleted - self.failed_deletions
        }
    }
}
