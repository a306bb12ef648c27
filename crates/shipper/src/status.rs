//! Status endpoint access

use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw status payload for one pool: named fields plus integer counters.
pub type RawStatus = Map<String, Value>;

/// Source of raw pool status snapshots. No retry at this seam: backoff
/// policy belongs to the caller per pool, so one broken endpoint never
/// blocks the others in a cycle.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetches the raw status map behind one pool's status path.
    async fn fetch(&self, status_path: &str) -> Result<RawStatus, FetchError>;
}

/// Fetches pool status from the local agent over HTTP. The `?json` query
/// parameter selects the JSON representation of the status page.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    agent_host: String,
}

impl HttpStatusSource {
    /// Creates a source targeting `host:port` of the status agent.
    pub fn new(agent_host: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(STATUS_TIMEOUT)
            .build()
            .map_err(|err| FetchError::Request(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            agent_host: agent_host.into(),
        })
    }

    fn status_url(&self, status_path: &str) -> String {
        format!("http://{}{}?json", self.agent_host, status_path)
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, status_path: &str) -> Result<RawStatus, FetchError> {
        let response = self
            .client
            .get(self.status_url(status_path))
            .send()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }
        let value: Value = response
            .json()
            .await
            .map_err(|err| FetchError::Malformed(err.to_string()))?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(FetchError::Malformed(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_url_appends_json_selector() {
        let source = HttpStatusSource::new("localhost:8008").unwrap();
        assert_eq!(
            source.status_url("/status/web"),
            "http://localhost:8008/status/web?json"
        );
    }
}
