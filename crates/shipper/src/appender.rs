//! Batch append protocol
//!
//! One batch per cycle, at most one in flight per stream. On a conflict the
//! batch is dropped rather than retried with the freshly resolved token:
//! re-sending already-timestamped events after resolution could duplicate
//! delivered entries, and metrics are sampled, so interval loss is the
//! cheaper failure.

use crate::token::SequenceTokenStore;
use poolwatch_logstream::{InputLogEvent, PutEventsError, StreamStore};
use tracing::{debug, warn};

/// Outcome of one cycle's append, consumed by explicit branching in the
/// poll loop.
#[derive(Debug)]
pub enum AppendOutcome {
    /// Nothing to send; the token is untouched.
    Skipped,

    /// The batch landed and the token advanced to the server-assigned value.
    Delivered,

    /// The held token was stale. It has been invalidated, the batch is
    /// dropped, and the caller must re-resolve before the next append.
    Conflict,

    /// Transient or other failure. Token untouched, batch dropped; the same
    /// pools refetch next cycle with fresh timestamps.
    Failed(PutEventsError),
}

/// Appends each cycle's batch to the target stream.
pub struct LogAppender {
    group: String,
    stream: String,
}

impl LogAppender {
    pub fn new(group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stream: stream.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Sends `events` using the currently held token.
    pub async fn append_batch(
        &self,
        store: &dyn StreamStore,
        tokens: &mut SequenceTokenStore,
        events: &[InputLogEvent],
    ) -> AppendOutcome {
        if events.is_empty() {
            return AppendOutcome::Skipped;
        }
        debug!(
            group = %self.group,
            stream = %self.stream,
            events = events.len(),
            "sending events"
        );
        match store
            .put_events(&self.group, &self.stream, tokens.current(), events)
            .await
        {
            Ok(next) => {
                tokens.advance(next);
                AppendOutcome::Delivered
            }
            Err(PutEventsError::SequenceConflict { expected }) => {
                warn!(
                    group = %self.group,
                    stream = %self.stream,
                    ?expected,
                    "append rejected for stale sequence token"
                );
                tokens.invalidate();
                AppendOutcome::Conflict
            }
            Err(err) => AppendOutcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use poolwatch_logstream::MemoryLogStore;
    use std::time::Duration;

    fn event(timestamp: i64) -> InputLogEvent {
        InputLogEvent {
            timestamp,
            message: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_batch_is_skipped_without_an_append() {
        let store = MemoryLogStore::new();
        store.create_stream("g", "s").await.unwrap();
        let mut tokens = SequenceTokenStore::new(RetryPolicy::bounded(Duration::from_millis(1), 1));
        let appender = LogAppender::new("g", "s");

        let outcome = appender.append_batch(&store, &mut tokens, &[]).await;
        assert!(matches!(outcome, AppendOutcome::Skipped));
        assert!(store.events("g", "s").is_empty());
        assert!(tokens.current().is_none());
    }

    #[tokio::test]
    async fn delivery_advances_the_token() {
        let store = MemoryLogStore::new();
        store.create_stream("g", "s").await.unwrap();
        let mut tokens = SequenceTokenStore::new(RetryPolicy::bounded(Duration::from_millis(1), 1));
        let appender = LogAppender::new("g", "s");

        let outcome = appender
            .append_batch(&store, &mut tokens, &[event(1000)])
            .await;
        assert!(matches!(outcome, AppendOutcome::Delivered));
        assert_eq!(tokens.current(), store.expected_token("g", "s").as_ref());
    }

    #[tokio::test]
    async fn conflict_invalidates_the_token_and_drops_the_batch() {
        let store = MemoryLogStore::new();
        store.create_stream("g", "s").await.unwrap();
        let mut tokens = SequenceTokenStore::new(RetryPolicy::bounded(Duration::from_millis(1), 1));
        let appender = LogAppender::new("g", "s");
        appender
            .append_batch(&store, &mut tokens, &[event(1000)])
            .await;

        // A concurrent writer advances the stream behind our back.
        let foreign = store
            .put_events(
                "g",
                "s",
                store.expected_token("g", "s").as_ref(),
                &[event(2000)],
            )
            .await
            .unwrap();

        let outcome = appender
            .append_batch(&store, &mut tokens, &[event(3000)])
            .await;
        assert!(matches!(outcome, AppendOutcome::Conflict));
        assert!(tokens.current().is_none());
        // The conflicting batch was not delivered.
        assert_eq!(store.events("g", "s").len(), 2);
        assert_eq!(store.expected_token("g", "s"), Some(foreign));
    }

    #[tokio::test]
    async fn other_failures_leave_the_token_untouched() {
        let store = MemoryLogStore::new();
        store.create_stream("g", "s").await.unwrap();
        let mut tokens = SequenceTokenStore::new(RetryPolicy::bounded(Duration::from_millis(1), 1));
        let appender = LogAppender::new("g", "s");
        appender
            .append_batch(&store, &mut tokens, &[event(1000)])
            .await;
        let held = tokens.current().cloned();

        // Decreasing timestamp is rejected as invalid, not as a conflict.
        let outcome = appender
            .append_batch(&store, &mut tokens, &[event(500)])
            .await;
        assert!(matches!(outcome, AppendOutcome::Failed(_)));
        assert_eq!(tokens.current().cloned(), held);
    }
}
