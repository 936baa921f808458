use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by a retention run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The service rejected the credentials during the handshake.
    #[error("authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("{context}: {message}")]
    Transport { context: String, message: String },
    /// The service returned a post we could not map onto [`crate::twitter::Post`].
    #[error("malformed post in timeline response: {0}")]
    MalformedPost(String),
    #[error("failed to delete post {id}: {message}")]
    Delete { id: String, message: String },
    #[error("failed to write ledger {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl Error {
    pub(crate) fn transport(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Whether the run should stop when this error occurs.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Delete { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
