//! Per-pool delta tracking
//!
//! A tracker owns one pool's counter baseline across cycles. Fetched counters
//! are staged, not committed: the baseline only advances after the enclosing
//! cycle's batch has been appended, so a crashed or failed cycle is refetched
//! next interval instead of double-counted.

use crate::error::{FetchError, StateError};
use crate::status::{RawStatus, StatusSource};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Counters treated as monotonically increasing and shipped with
/// per-interval deltas.
pub const TRACKED_COUNTERS: [&str; 3] = ["accepted conn", "max children reached", "slow requests"];

/// Field whose change marks a worker-manager restart.
const START_TIME_FIELD: &str = "start time";

/// Tracks one pool's counters across cycles and computes per-interval deltas.
pub struct PoolTracker {
    name: String,
    status_path: String,
    start_time: i64,
    previous: HashMap<String, i64>,
    current: Option<HashMap<String, i64>>,
}

impl PoolTracker {
    /// Creates a tracker with a zeroed baseline.
    pub fn new(name: impl Into<String>, status_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status_path: status_path.into(),
            start_time: 0,
            previous: HashMap::new(),
            current: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status_path(&self) -> &str {
        &self.status_path
    }

    /// Baseline value from the last committed cycle; 0 for unseen keys.
    pub fn previous_counter(&self, key: &str) -> i64 {
        self.previous.get(key).copied().unwrap_or(0)
    }

    /// True while a fetched snapshot is staged awaiting `commit`.
    pub fn has_staged(&self) -> bool {
        self.current.is_some()
    }

    /// Fetches the pool's status and returns the raw payload with
    /// `delta <counter>` fields attached. The fetched counters are staged;
    /// the baseline advances only on `commit`.
    pub async fn fetch_and_delta<S: StatusSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<RawStatus, FetchError> {
        let raw = source.fetch(&self.status_path).await?;
        Ok(self.ingest(raw))
    }

    /// Delta computation against the tracked baseline. Separate from the
    /// fetch so it stays synchronous and directly testable.
    pub fn ingest(&mut self, mut raw: RawStatus) -> RawStatus {
        let start_time = raw
            .get(START_TIME_FIELD)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if start_time != self.start_time {
            // Worker manager restarted (or this is the first fetch); deltas
            // restart from a zeroed baseline so they never go negative.
            debug!(pool = %self.name, start_time, "start time changed, resetting baseline");
            self.previous.clear();
            self.start_time = start_time;
        }

        let mut current = HashMap::new();
        for key in TRACKED_COUNTERS {
            let value = raw.get(key).and_then(Value::as_i64).unwrap_or(0);
            current.insert(key.to_string(), value);
            raw.insert(
                format!("delta {key}"),
                Value::from(value - self.previous_counter(key)),
            );
        }
        self.current = Some(current);
        raw
    }

    /// Commits the staged counters as the next baseline. Called only after
    /// the cycle's batch was appended successfully.
    pub fn commit(&mut self) -> Result<(), StateError> {
        match self.current.take() {
            Some(current) => {
                self.previous = current;
                Ok(())
            }
            None => Err(StateError {
                pool: self.name.clone(),
            }),
        }
    }
}
