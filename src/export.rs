//! CSV export of the run ledgers.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::constants::LEDGER_HEADER;
use crate::error::{Error, Result};
use crate::ledger::{DecisionRecord, Ledger};

/// Files written by [`export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub deleted: PathBuf,
    pub saved: PathBuf,
    /// Only written when at least one live deletion failed.
    pub failed: Option<PathBuf>,
}

#[derive(Serialize)]
struct FailedRow<'a> {
    id: &'a str,
    date: &'a str,
    text: &'a str,
    author_id: &'a str,
    author_handle: &'a str,
    favorite_count: u64,
    retweet_count: u64,
    error: &'a str,
}

/// Append `.csv` if missing and prefix the file name, keeping the directory.
#[must_use]
pub fn prefixed_path(base: &Path, prefix: &str) -> PathBuf {
    let file_name = base
        .file_name()
        .map_or_else(|| "tweets".to_string(), |n| n.to_string_lossy().into_owned());
    let file_name = if file_name.to_ascii_lowercase().ends_with(".csv") {
        file_name
    } else {
        format!("{file_name}.csv")
    };
    base.with_file_name(format!("{prefix}{file_name}"))
}

/// Write `deleted_<base>` and `saved_<base>`, plus `failed_<base>` when live
/// deletions failed. Existing files are overwritten.
///
/// # Errors
///
/// Returns [`Error::Export`] naming the path that could not be written.
pub fn export(ledger: &Ledger, base: &Path) -> Result<ExportPaths> {
    let deleted = prefixed_path(base, "deleted_");
    let saved = prefixed_path(base, "saved_");

    write_records(&deleted, ledger.deleted())?;
    write_records(&saved, ledger.saved())?;

    let failed = if ledger.failed().is_empty() {
        None
    } else {
        let path = prefixed_path(base, "failed_");
        let rows: Vec<FailedRow<'_>> = ledger
            .failed()
            .iter()
            .map(|f| FailedRow {
                id: &f.record.id,
                date: &f.record.date,
                text: &f.record.text,
                author_id: &f.record.author_id,
                author_handle: &f.record.author_handle,
                favorite_count: f.record.favorite_count,
                retweet_count: f.record.retweet_count,
                error: &f.error,
            })
            .collect();
        let mut header = LEDGER_HEADER.to_vec();
        header.push("error");
        write_rows(&path, &header, &rows)?;
        Some(path)
    };

    info!(
        deleted = %deleted.display(),
        saved = %saved.display(),
        failed = ?failed.as_ref().map(|p| p.display().to_string()),
        "Ledgers exported"
    );

    Ok(ExportPaths {
        deleted,
        saved,
        failed,
    })
}

fn write_records(path: &Path, records: &[DecisionRecord]) -> Result<()> {
    write_rows(path, &LEDGER_HEADER, records)
}

fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let to_err = |source: csv::Error| Error::Export {
        path: path.to_path_buf(),
        source,
    };

    // Header is written explicitly so empty ledgers still carry it.
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(to_err)?;
    wtr.write_record(header).map_err(to_err)?;
    for row in rows {
        wtr.serialize(row).map_err(to_err)?;
    }
    wtr.flush().map_err(|e| to_err(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::twitter::Post;

    fn post(id: &str, text: &str) -> Post {
        Post {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap(),
            text: text.to_string(),
            author_id: "10".to_string(),
            author_handle: "me".to_string(),
            favorite_count: 4,
            retweet_count: 2,
            source: "web".to_string(),
        }
    }

    #[test]
    fn test_prefixed_path() {
        assert_eq!(
            prefixed_path(Path::new("tweets.csv"), "deleted_"),
            PathBuf::from("deleted_tweets.csv")
        );
        assert_eq!(
            prefixed_path(Path::new("tweets"), "saved_"),
            PathBuf::from("saved_tweets.csv")
        );
        assert_eq!(
            prefixed_path(Path::new("out/run.CSV"), "deleted_"),
            PathBuf::from("out/deleted_run.CSV")
        );
    }

    #[test]
    fn test_export_writes_both_ledgers() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::new();
        ledger.record_deleted(&post("1", "old news"));
        ledger.record_saved(&post("2", "keeper, with comma"));

        let paths = export(&ledger, &dir.path().join("tweets")).unwrap();
        assert_eq!(paths.deleted, dir.path().join("deleted_tweets.csv"));
        assert_eq!(paths.saved, dir.path().join("saved_tweets.csv"));
        assert!(paths.failed.is_none());

        let deleted = std::fs::read_to_string(&paths.deleted).unwrap();
        let lines: Vec<&str> = deleted.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "id,date,text,user.id,user.screen_name,favorite_count,retweet_count"
        );
        assert_eq!(lines[1], "1,2021-01-02 03:04:05,old news,10,me,4,2");

        let saved = std::fs::read_to_string(&paths.saved).unwrap();
        let lines: Vec<&str> = saved.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2,2021-01-02 03:04:05,\"keeper, with comma\",10,me,4,2");
    }

    #[test]
    fn test_empty_ledgers_keep_header() {
        let dir = TempDir::new().unwrap();
        let paths = export(&Ledger::new(), &dir.path().join("empty.csv")).unwrap();
        let saved = std::fs::read_to_string(paths.saved).unwrap();
        assert_eq!(saved.lines().count(), 1);
    }

    #[test]
    fn test_failed_ledger_written_when_deletes_fail() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::new();
        let p = post("9", "stubborn");
        ledger.record_deleted(&p);
        ledger.record_failed_deletion(&p, "status 403");

        let paths = export(&ledger, &dir.path().join("tweets.csv")).unwrap();
        let failed = std::fs::read_to_string(paths.failed.unwrap()).unwrap();
        let lines: Vec<&str> = failed.lines().collect();
        assert_eq!(
            lines[0],
            "id,date,text,user.id,user.screen_name,favorite_count,retweet_count,error"
        );
        assert_eq!(lines[1], "9,2021-01-02 03:04:05,stubborn,10,me,4,2,status 403");
    }

    #[test]
    fn test_unwritable_path_names_the_path() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("missing-dir").join("tweets.csv");
        let err = export(&Ledger::new(), &base).unwrap_err();
        match err {
            Error::Export { path, .. } => {
                assert_eq!(path, dir.path().join("missing-dir").join("deleted_tweets.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
