//! Configuration types for fetch-syncer

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

/// Client-wide defaults merged under every call's [`RequestOptions`](crate::types::RequestOptions)
///
/// A `SyncerConfig` is owned by the [`Syncer`](crate::Syncer) that was built
/// from it; nothing here is process-global. Durations serialize as integer
/// milliseconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncerConfig {
    /// Request timeout (default: 15000 ms, zero disables)
    #[serde(default = "default_timeout", with = "duration_ms_serde")]
    pub timeout: Duration,

    /// Timeout applied to each proxy attempt unless the caller set one (default: 5000 ms)
    #[serde(default = "default_proxy_timeout", with = "duration_ms_serde")]
    pub proxy_timeout: Duration,

    /// Concurrency bound for batch downloads when the call does not set one (default: 3)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Retry policy used by the opt-in retry operation
    #[serde(default)]
    pub retry: RetryConfig,

    /// Headers sent with every request; per-call headers win on conflict
    #[serde(default)]
    pub default_headers: HashMap<String, String>,

    /// User-Agent for the default reqwest transport
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            proxy_timeout: default_proxy_timeout(),
            max_concurrency: default_max_concurrency(),
            retry: RetryConfig::default(),
            default_headers: HashMap::new(),
            user_agent: None,
        }
    }
}

impl SyncerConfig {
    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::Config {
                message: "max_concurrency must be at least 1".to_string(),
                key: Some("max_concurrency".to_string()),
            });
        }
        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier <= 0.0 {
            return Err(Error::Config {
                message: "backoff_multiplier must be positive".to_string(),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        Ok(())
    }
}

/// Retry behavior configuration
///
/// Consumed only by [`Syncer::request_with_retry`](crate::Syncer::request_with_retry);
/// the plain request path never retries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1000 ms)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30000 ms)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_millis(15_000)
}

fn default_proxy_timeout() -> Duration {
    Duration::from_millis(5_000)
}

fn default_max_concurrency() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(1_000)
}

fn default_max_delay() -> Duration {
    Duration::from_millis(30_000)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (integer milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
