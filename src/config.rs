//! Configuration types.
//!
//! Everything is read once at startup and handed to components at
//! construction. Nothing below the binary reads the environment.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default OpenAI API base.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Assistant service configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// API key sent as a bearer token.
    pub api_key: SecretString,
    /// API base, without trailing slash.
    pub base_url: String,
    /// Assistant identity bound to every run.
    pub assistant_id: String,
    /// Timeout for each individual HTTP call.
    pub request_timeout: Duration,
}

/// Poll/wait settings for classification runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between status checks.
    pub interval: Duration,
    /// Overall deadline, measured from run creation.
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            deadline: Duration::from_secs(60),
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub classifier: ClassifierConfig,
    pub poll: PollConfig,
    /// libSQL database file.
    pub db_path: String,
    /// HTTP listen port.
    pub port: u16,
}

impl ServiceConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, "OPENAI_API_KEY")?;
        let assistant_id = required(&lookup, "CLASSIFIER_ASSISTANT_ID")?;

        let base_url = lookup("OPENAI_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let defaults = PollConfig::default();
        let interval_ms = parsed(
            &lookup,
            "CLASSIFIER_POLL_INTERVAL_MS",
            defaults.interval.as_millis() as u64,
        )?;
        let deadline_secs = parsed(
            &lookup,
            "CLASSIFIER_DEADLINE_SECS",
            defaults.deadline.as_secs(),
        )?;
        let timeout_secs: u64 = parsed(&lookup, "CLASSIFIER_REQUEST_TIMEOUT_SECS", 30)?;

        if interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CLASSIFIER_POLL_INTERVAL_MS".into(),
                message: "must be greater than zero".into(),
            });
        }

        let db_path = lookup("INBOX_BUCKETS_DB_PATH")
            .unwrap_or_else(|| "./data/inbox-buckets.db".to_string());
        let port: u16 = parsed(&lookup, "INBOX_BUCKETS_PORT", 8080)?;

        Ok(Self {
            classifier: ClassifierConfig {
                api_key: SecretString::from(api_key),
                base_url,
                assistant_id,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            poll: PollConfig {
                interval: Duration::from_millis(interval_ms),
                deadline: Duration::from_secs(deadline_secs),
            },
            db_path,
            port,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
