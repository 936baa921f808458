use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{DEFAULT_API_BASE_URL, MAX_PAGE_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read credentials file {path}: {source}")]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse credentials file {path}: {message}")]
    ParseCredentials { path: PathBuf, message: String },
    #[error("credentials file {path} is missing required field '{field}'")]
    MissingField { path: PathBuf, field: &'static str },
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Raw shape of the credentials file. Every field is optional here so that a
/// missing key is reported by name rather than as a generic parse error.
#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "API Key")]
    api_key: Option<String>,
    #[serde(rename = "API Secret Key")]
    api_secret_key: Option<String>,
    #[serde(rename = "Access Token")]
    access_token: Option<String>,
    #[serde(rename = "Access Token Secret")]
    access_token_secret: Option<String>,
    #[serde(rename = "Access level")]
    access_level: Option<String>,
}

/// OAuth 1.0a consumer and access tokens for a single account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret_key: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub access_level: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret_key", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"<redacted>")
            .field("access_level", &self.access_level)
            .finish()
    }
}

impl Credentials {
    /// Load credentials from a JSON file, or TOML when the path ends in `.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any of the
    /// five required fields is missing or empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadCredentials {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let file: CredentialsFile = if is_toml {
            toml::from_str(raw).map_err(|e| ConfigError::ParseCredentials {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(raw).map_err(|e| ConfigError::ParseCredentials {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        let require = |value: Option<String>, field: &'static str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingField {
                    path: path.to_path_buf(),
                    field,
                })
        };

        Ok(Self {
            api_key: require(file.api_key, "API Key")?,
            api_secret_key: require(file.api_secret_key, "API Secret Key")?,
            access_token: require(file.access_token, "Access Token")?,
            access_token_secret: require(file.access_token_secret, "Access Token Secret")?,
            access_level: require(file.access_level, "Access level")?,
        })
    }
}

/// HTTP client settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub page_size: u32,
    /// Extra attempts for a failed timeline page before giving up.
    pub page_retries: u32,
    pub retry_backoff: Duration,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: env_or_default("TWITTER_API_BASE_URL", DEFAULT_API_BASE_URL),
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),
            page_size: parse_env_u32("TIMELINE_PAGE_SIZE", MAX_PAGE_SIZE)?,
            page_retries: parse_env_u32("PAGE_FETCH_RETRIES", 2)?,
            retry_backoff: Duration::from_millis(parse_env_u64("RETRY_BACKOFF_MS", 500)?),
        })
    }

    /// Settings pointed at a local mock server, with fast retries.
    #[must_use]
    pub fn for_testing(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.to_string(),
            http_timeout: Duration::from_secs(5),
            page_size: MAX_PAGE_SIZE,
            page_retries: 0,
            retry_backoff: Duration::from_millis(1),
        }
    }

    /// Validate that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                name: "TIMELINE_PAGE_SIZE".to_string(),
                message: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }
        if url::Url::parse(&self.api_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "TWITTER_API_BASE_URL".to_string(),
                message: format!("'{}' is not a valid URL", self.api_base_url),
            });
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
