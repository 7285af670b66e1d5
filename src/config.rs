//! Configuration types for rentroll-batch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://connect.rediq.io";

/// Environment variable holding the bearer credential
pub const ENV_API_KEY: &str = "RADIX_API_KEY";
/// Environment variable overriding the API base URL
pub const ENV_API_URL: &str = "RADIX_API_URL";
/// Environment variable holding the default notification email
pub const ENV_NOTIFICATION_EMAIL: &str = "RADIX_NOTIFICATION_EMAIL";

/// Main configuration for [`BatchWorkflow`](crate::workflow::BatchWorkflow)
///
/// Fields are organized into logical sub-configs for maintainability:
/// - [`poll`](PollConfig): polling interval, budget, failure tolerance
/// - [`http`](HttpConfig): per-call timeouts and client identity
/// - [`extraction`](ExtractionConfig): result archive handling
///
/// All sub-config fields are flattened for serialization, so the JSON/TOML
/// format stays flat (no nesting).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// API base URL (default: `https://connect.rediq.io`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer credential for the API
    #[serde(default)]
    pub api_key: String,

    /// Notification email used when a request supplies no explicit method
    #[serde(default)]
    pub default_notification_email: Option<String>,

    /// Status values considered terminal
    ///
    /// The exact literals differ across API documentation fragments
    /// (`complete` vs `completed`, presence of `partial`), so the set is
    /// configurable rather than hardcoded.
    #[serde(default = "default_terminal_statuses")]
    pub terminal_statuses: Vec<String>,

    /// Polling behavior
    #[serde(flatten)]
    pub poll: PollConfig,

    /// HTTP client behavior
    #[serde(flatten)]
    pub http: HttpConfig,

    /// Result extraction behavior
    #[serde(flatten)]
    pub extraction: ExtractionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            default_notification_email: None,
            terminal_statuses: default_terminal_statuses(),
            poll: PollConfig::default(),
            http: HttpConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl Config {
    /// Build a config from the process environment
    ///
    /// Reads `RADIX_API_KEY` (required), `RADIX_API_URL` and
    /// `RADIX_NOTIFICATION_EMAIL`; everything else takes defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_API_KEY).map_err(|_| Error::Config {
            message: format!("{} environment variable is not set", ENV_API_KEY),
            key: Some("api_key".to_string()),
        })?;

        let mut config = Self {
            api_key,
            ..Default::default()
        };

        if let Ok(url) = std::env::var(ENV_API_URL)
            && !url.trim().is_empty()
        {
            config.base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(email) = std::env::var(ENV_NOTIFICATION_EMAIL)
            && !email.trim().is_empty()
        {
            config.default_notification_email = Some(email.trim().to_string());
        }

        Ok(config)
    }

    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config {
                message: "api_key must not be empty".to_string(),
                key: Some("api_key".to_string()),
            });
        }

        url::Url::parse(&self.base_url).map_err(|e| Error::Config {
            message: format!("base_url is not a valid URL: {}", e),
            key: Some("base_url".to_string()),
        })?;

        if self.poll.interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("interval".to_string()),
            });
        }

        if self.terminal_statuses.is_empty() {
            return Err(Error::Config {
                message: "terminal_statuses must not be empty".to_string(),
                key: Some("terminal_statuses".to_string()),
            });
        }

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Polling loop configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status queries (default: 7.5s)
    #[serde(default = "default_poll_interval", rename = "poll_interval")]
    pub interval: Duration,

    /// Total budget before the loop fails with a timeout (default: 900s)
    #[serde(default = "default_poll_timeout", rename = "poll_timeout")]
    pub timeout: Duration,

    /// Consecutive transient failures tolerated before escalating (default: 3)
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Backoff applied between transient-failure retries
    #[serde(default)]
    pub failure_backoff: BackoffConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            timeout: default_poll_timeout(),
            max_consecutive_failures: default_max_consecutive_failures(),
            failure_backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential backoff configuration for transient poll failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry (default: 1s)
    #[serde(default = "default_initial_delay")]
    pub initial_delay: Duration,

    /// Upper bound on the delay (default: 60s)
    #[serde(default = "default_max_delay")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each failure (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to prevent thundering herd (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for the multipart upload call (default: 120s)
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout: Duration,

    /// Timeout for a single status query (default: 30s)
    #[serde(default = "default_status_timeout")]
    pub status_timeout: Duration,

    /// Timeout for downloading a result archive (default: 120s)
    #[serde(default = "default_download_timeout")]
    pub download_timeout: Duration,

    /// User-Agent header sent on every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            upload_timeout: default_upload_timeout(),
            status_timeout: default_status_timeout(),
            download_timeout: default_download_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Result extraction configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Glob-style inclusion patterns for archive entries
    #[serde(default = "default_extract_patterns", rename = "extract_patterns")]
    pub patterns: Vec<String>,

    /// Caller-supplied extraction directory (only used with
    /// [`OutputDirStrategy::UseOutputDir`])
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// How the extraction destination is chosen
    #[serde(default)]
    pub output_dir_strategy: OutputDirStrategy,

    /// Maximum preview rows returned per extracted CSV (default: 200)
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Full text is only inlined for CSVs at or below this size (default: 250 KB)
    #[serde(default = "default_inline_max_bytes")]
    pub inline_max_bytes: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            patterns: default_extract_patterns(),
            output_dir: None,
            output_dir_strategy: OutputDirStrategy::default(),
            preview_rows: default_preview_rows(),
            inline_max_bytes: default_inline_max_bytes(),
        }
    }
}

/// Strategy for choosing the extraction destination directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDirStrategy {
    /// Always allocate a fresh OS temp directory
    #[default]
    Temp,
    /// Use the configured `output_dir`; must be absolute and writable,
    /// otherwise falls back to temp with a warning
    UseOutputDir,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// The default terminal status set
///
/// Covers both naming variants seen in the API documentation.
pub fn default_terminal_statuses() -> Vec<String> {
    [
        "complete",
        "completed",
        "failed",
        "partial",
        "partially complete",
        "partially completed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(7500)
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(900)
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_upload_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_status_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_user_agent() -> String {
    format!("rentroll-batch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_extract_patterns() -> Vec<String> {
    vec!["processed-csv/**".to_string()]
}

fn default_preview_rows() -> usize {
    200
}

fn default_inline_max_bytes() -> u64 {
    250_000
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_production_api() {
        let config = Config::default();
        assert_eq!(config.base_url, "https://connect.rediq.io");
        assert_eq!(config.poll.interval, Duration::from_millis(7500));
        assert_eq!(config.poll.timeout, Duration::from_secs(900));
        assert_eq!(config.poll.max_consecutive_failures, 3);
        assert_eq!(config.extraction.patterns, vec!["processed-csv/**"]);
        assert_eq!(config.extraction.preview_rows, 200);
        assert_eq!(config.extraction.inline_max_bytes, 250_000);
        assert_eq!(
            config.extraction.output_dir_strategy,
            OutputDirStrategy::Temp
        );
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        match err {
            crate::error::Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("api_key"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let config = Config {
            api_key: "riq_live_test".to_string(),
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_sane_config() {
        let config = Config {
            api_key: "riq_live_test".to_string(),
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = Config {
            base_url: "https://connect.rediq.io/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url_trimmed(), "https://connect.rediq.io");
    }

    #[test]
    fn default_terminal_set_covers_both_spellings() {
        let set = default_terminal_statuses();
        assert!(set.contains(&"complete".to_string()));
        assert!(set.contains(&"completed".to_string()));
        assert!(set.contains(&"partial".to_string()));
    }
}
