use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::error::{Result, SyncError};

pub const DEFAULT_API_URL: &str = "https://gitlab.com/api/v4";
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ── Retry ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    None,
    Linear,
    #[default]
    Exponential,
}

impl FromStr for BackoffStrategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(BackoffStrategy::None),
            "linear" => Ok(BackoffStrategy::Linear),
            "exponential" => Ok(BackoffStrategy::Exponential),
            other => Err(SyncError::Config(format!(
                "unknown backoff strategy '{other}' (expected none, linear or exponential)"
            ))),
        }
    }
}

/// How failed feed requests are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts including the first one. 1 disables retry.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

// ── Local time ──

/// How instants are mapped to local calendar days and record lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalZone {
    /// One offset for every instant.
    Fixed(UtcOffset),
    /// The system offset in effect at each instant, so records on either
    /// side of a DST change land on the right day. `fallback` applies when
    /// the system offset cannot be determined.
    System { fallback: UtcOffset },
}

impl LocalZone {
    pub fn offset_at(self, at: OffsetDateTime) -> UtcOffset {
        match self {
            LocalZone::Fixed(offset) => offset,
            LocalZone::System { fallback } => UtcOffset::local_offset_at(at).unwrap_or(fallback),
        }
    }
}

impl From<UtcOffset> for LocalZone {
    fn from(offset: UtcOffset) -> Self {
        LocalZone::Fixed(offset)
    }
}

// ── Sync configuration ──

/// Everything a sync run needs, resolved once at startup and passed to
/// each component.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_token: String,
    pub api_url: String,
    /// Git working tree receiving daily record files and sync commits.
    pub target_dir: PathBuf,
    /// Delay after each fully materialized page of events.
    pub pacing: Duration,
    pub request_timeout: Duration,
    pub retry: RetrySettings,
    /// Zone used for daily file names and record lines.
    pub local_zone: LocalZone,
}

impl SyncConfig {
    pub fn new(api_token: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_token: api_token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            target_dir: target_dir.into(),
            pacing: DEFAULT_PACING,
            request_timeout: DEFAULT_TIMEOUT,
            retry: RetrySettings::default(),
            local_zone: LocalZone::Fixed(UtcOffset::UTC),
        }
    }

    /// Reject configurations that cannot possibly run.
    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(SyncError::Config("API token is empty".into()));
        }
        if !self.target_dir.is_dir() {
            return Err(SyncError::Config(format!(
                "target directory does not exist: {}",
                self.target_dir.display()
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::Config("max attempts must be at least 1".into()));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(SyncError::Config(format!(
                "API URL must be http(s): {}",
                self.api_url
            )));
        }
        Ok(())
    }
}
