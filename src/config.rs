use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LogisticsError;

/// What the scheduler does when an assignment would push an associate past
/// the daily capacity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Surface the conflict but let the operator proceed.
    Advise,
    /// Refuse the transition outright.
    Block,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "advise" => Ok(ConflictPolicy::Advise),
            "block" => Ok(ConflictPolicy::Block),
            other => Err(format!("unknown conflict policy: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub conflict_threshold_hours: f64,
    pub poll_interval_ms: u64,
    pub conflict_policy: ConflictPolicy,
    pub request_timeout_secs: u64,
    pub event_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, LogisticsError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
            conflict_threshold_hours: parse_or_default("CONFLICT_THRESHOLD_HOURS", 12.0)?,
            poll_interval_ms: parse_or_default("POLL_INTERVAL_MS", 30_000)?,
            conflict_policy: parse_or_default("CONFLICT_POLICY", ConflictPolicy::Advise)?,
            request_timeout_secs: parse_or_default("REQUEST_TIMEOUT_SECS", 10)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            conflict_threshold_hours: 12.0,
            poll_interval_ms: 30_000,
            conflict_policy: ConflictPolicy::Advise,
            request_timeout_secs: 10,
            event_buffer_size: 1024,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, LogisticsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| LogisticsError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
