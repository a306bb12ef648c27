//! Sequence token ownership and resolution

use crate::config::RetryPolicy;
use poolwatch_logstream::{SequenceToken, StoreError, StreamStore};
use thiserror::Error;
use tracing::{info, warn};

/// Token resolution gave up under a bounded retry policy.
#[derive(Debug, Error)]
#[error("unable to resolve sequence token for {group}:{stream} after {attempts} attempts")]
pub struct ResolveError {
    pub group: String,
    pub stream: String,
    pub attempts: u32,
}

/// Owns the append-ordering token for one stream. `None` is a valid state:
/// it means first-write semantics, either because the stream is empty or
/// because the held token was invalidated after a conflict.
pub struct SequenceTokenStore {
    token: Option<SequenceToken>,
    retry: RetryPolicy,
}

impl SequenceTokenStore {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { token: None, retry }
    }

    /// Token to use for the next append.
    pub fn current(&self) -> Option<&SequenceToken> {
        self.token.as_ref()
    }

    /// Adopts the token returned by a successful append. The next append
    /// must use exactly this value.
    pub fn advance(&mut self, next: SequenceToken) {
        self.token = Some(next);
    }

    /// Discards a token known to be stale. `resolve` must run before the
    /// next append.
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    /// Re-derives the token from the stream directory, creating the stream
    /// if it does not exist. Retries per the policy: this path only runs at
    /// startup or after an append conflict, and giving up would permanently
    /// stop delivery.
    pub async fn resolve(
        &mut self,
        store: &dyn StreamStore,
        group: &str,
        stream: &str,
    ) -> Result<(), ResolveError> {
        let mut attempts = 0u32;
        loop {
            match try_resolve(store, group, stream).await {
                Ok(token) => {
                    self.token = token;
                    return Ok(());
                }
                Err(err) => {
                    warn!(group, stream, error = %err, "unable to resolve sequence token, will retry");
                }
            }
            attempts += 1;
            if self.retry.exhausted(attempts) {
                return Err(ResolveError {
                    group: group.to_string(),
                    stream: stream.to_string(),
                    attempts,
                });
            }
            tokio::time::sleep(self.retry.delay).await;
        }
    }
}

async fn try_resolve(
    store: &dyn StreamStore,
    group: &str,
    stream: &str,
) -> Result<Option<SequenceToken>, StoreError> {
    // The prefix search may return more streams than asked about; only an
    // exact name match counts.
    let streams = store.describe_streams(group, stream).await?;
    for info in streams {
        if info.name == stream {
            return Ok(info.upload_sequence_token);
        }
    }

    // Not found: create it. A concurrent writer may win the race; the
    // already-exists error lands in the retry loop and the next describe
    // finds the stream.
    info!(group, stream, "stream not found, creating");
    store.create_stream(group, stream).await?;
    Ok(None)
}
