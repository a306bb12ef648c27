//! Environment-driven configuration

use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const AGENT_HOST_VAR: &str = "POOLWATCH_AGENT_HOST";
const LOG_GROUP_VAR: &str = "POOLWATCH_LOG_GROUP";
const LOG_STREAM_VAR: &str = "POOLWATCH_LOG_STREAM";
const POLL_INTERVAL_VAR: &str = "POOLWATCH_POLL_INTERVAL_SECS";
const METADATA_FILE_VAR: &str = "POOLWATCH_METADATA_FILE";
const POOLS_FILE_VAR: &str = "POOLWATCH_POOLS_FILE";
const LOGSTREAM_ENDPOINT_VAR: &str = "POOLWATCH_LOGSTREAM_ENDPOINT";

const DEFAULT_AGENT_HOST: &str = "localhost:8008";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
const TOKEN_RETRY_DELAY: Duration = Duration::from_secs(10);
const METADATA_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay retry policy. `max_attempts: None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Policy that never gives up.
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Policy that stops after `max_attempts` failures.
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    /// True once `attempts` failures have used up the policy.
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts
            .map(|max| attempts >= max)
            .unwrap_or(false)
    }
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// `host:port` of the local status agent.
    pub agent_host: String,

    /// Target log group.
    pub log_group: String,

    /// Explicit stream name; when absent the name is derived from container
    /// metadata or the hostname.
    pub stream_name_override: Option<String>,

    /// Time between cycles.
    pub poll_interval: Duration,

    /// Container metadata file for stream identity derivation.
    pub metadata_file: Option<PathBuf>,

    /// Declared pool list, re-read in full every cycle.
    pub pools_file: PathBuf,

    /// Base URL of the log-stream ingestion endpoint.
    pub logstream_endpoint: String,

    /// Retry policy for sequence token resolution.
    pub token_retry: RetryPolicy,

    /// Retry policy for the container metadata wait.
    pub metadata_retry: RetryPolicy,
}

impl Config {
    /// Reads the configuration from the environment. Fails only on missing
    /// required variables or unparseable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let agent_host =
            env::var(AGENT_HOST_VAR).unwrap_or_else(|_| DEFAULT_AGENT_HOST.to_string());
        let log_group = require(LOG_GROUP_VAR)?;
        let stream_name_override = optional(LOG_STREAM_VAR);
        let poll_interval = match optional(POLL_INTERVAL_VAR) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidVar {
                    name: POLL_INTERVAL_VAR,
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_POLL_INTERVAL,
        };
        let metadata_file = optional(METADATA_FILE_VAR).map(PathBuf::from);
        let pools_file = PathBuf::from(require(POOLS_FILE_VAR)?);
        let logstream_endpoint = require(LOGSTREAM_ENDPOINT_VAR)?;

        Ok(Self {
            agent_host,
            log_group,
            stream_name_override,
            poll_interval,
            metadata_file,
            pools_file,
            logstream_endpoint,
            token_retry: RetryPolicy::unbounded(TOKEN_RETRY_DELAY),
            metadata_retry: RetryPolicy::unbounded(METADATA_RETRY_DELAY),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingVar(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_policy_never_exhausts() {
        let policy = RetryPolicy::unbounded(Duration::from_secs(1));
        assert!(!policy.exhausted(0));
        assert!(!policy.exhausted(u32::MAX));
    }

    #[test]
    fn bounded_policy_exhausts_at_limit() {
        let policy = RetryPolicy::bounded(Duration::from_secs(1), 3);
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
        assert!(policy.exhausted(4));
    }
}
