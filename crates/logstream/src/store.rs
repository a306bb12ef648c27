//! Store trait and error taxonomy
//!
//! Append errors keep ordering conflicts distinguishable from transient
//! failures: the two demand different recoveries (token re-resolution versus
//! retrying with the same token next cycle).

use crate::event::{InputLogEvent, SequenceToken, StreamInfo};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from stream directory operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("stream already exists: {0}")]
    StreamAlreadyExists(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transient store error: {0}")]
    Transient(String),
}

/// Errors from `put_events`.
#[derive(Debug, Clone, Error)]
pub enum PutEventsError {
    /// The supplied token is stale relative to the stream's true tail, e.g.
    /// another writer appended concurrently. Carries the token the store
    /// expects when it is known.
    #[error("sequence token conflict, expected {expected:?}")]
    SequenceConflict { expected: Option<SequenceToken> },

    #[error("stream not found: {0}")]
    StreamNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transient store error: {0}")]
    Transient(String),
}

/// Append-only log stream target.
///
/// Streams live inside named groups. Each stream enforces strict write
/// ordering through its sequence token: an append must present the token
/// returned by the previous append (or no token for the first write) and
/// receives the token for the next one.
#[async_trait]
pub trait StreamStore: Send + Sync {
    /// Lists streams in `group` whose names start with `prefix`. A prefix
    /// search may return more than the caller asked about; exact-name
    /// filtering is the caller's job.
    async fn describe_streams(
        &self,
        group: &str,
        prefix: &str,
    ) -> Result<Vec<StreamInfo>, StoreError>;

    /// Creates an empty stream in `group`.
    async fn create_stream(&self, group: &str, stream: &str) -> Result<(), StoreError>;

    /// Appends `events` (non-empty, non-decreasing timestamps) to a stream
    /// and returns the token required by the next append.
    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        token: Option<&SequenceToken>,
        events: &[InputLogEvent],
    ) -> Result<SequenceToken, PutEventsError>;
}
