//! The poll loop: reconcile, fetch, append, commit
//!
//! Two states: idle (sleeping out the interval) and cycling. A cycle always
//! falls back to idle, success or not; nothing inside it may kill the loop.
//! Cycles never overlap: a cycle that runs long delays the next tick.

use crate::appender::{AppendOutcome, LogAppender};
use crate::config::Config;
use crate::registry::{read_pool_list, PoolRegistry};
use crate::status::StatusSource;
use crate::token::{ResolveError, SequenceTokenStore};
use poolwatch_logstream::{InputLogEvent, PutEventsError, SequenceToken, StreamStore};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Drives the fixed-interval cycle forever. Owns all mutable state: the
/// tracked pools, the sequence token, the appender. No globals.
pub struct PollLoop {
    config: Config,
    registry: PoolRegistry,
    tokens: SequenceTokenStore,
    appender: LogAppender,
    source: Arc<dyn StatusSource>,
    store: Arc<dyn StreamStore>,
}

impl PollLoop {
    pub fn new(
        config: Config,
        source: Arc<dyn StatusSource>,
        store: Arc<dyn StreamStore>,
        stream_name: String,
    ) -> Self {
        let tokens = SequenceTokenStore::new(config.token_retry);
        let appender = LogAppender::new(config.log_group.clone(), stream_name);
        Self {
            config,
            registry: PoolRegistry::new(),
            tokens,
            appender,
            source,
            store,
        }
    }

    /// Tracked pool set, for inspection.
    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    /// Currently held sequence token, for inspection.
    pub fn sequence_token(&self) -> Option<&SequenceToken> {
        self.tokens.current()
    }

    /// Resolves the current token from the stream directory, creating the
    /// stream when missing.
    pub async fn resolve_token(&mut self) -> Result<(), ResolveError> {
        self.tokens
            .resolve(
                self.store.as_ref(),
                self.appender.group(),
                self.appender.stream(),
            )
            .await
    }

    /// Resolves the initial token and cycles until the process is killed.
    pub async fn run(&mut self) -> Result<(), ResolveError> {
        self.resolve_token().await?;
        info!(
            group = %self.appender.group(),
            stream = %self.appender.stream(),
            interval_secs = self.config.poll_interval.as_secs(),
            "entering poll loop"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.run_cycle().await;
        }
    }

    /// One pass: reconcile pools, fetch all, append the batch, commit the
    /// included trackers. Every failure is contained here.
    pub async fn run_cycle(&mut self) {
        let declared = match read_pool_list(&self.config.pools_file).await {
            Ok(declared) => declared,
            Err(err) => {
                // Previous pool set stays tracked; only this cycle is lost.
                warn!(
                    file = %self.config.pools_file.display(),
                    error = %err,
                    "unable to read pool list"
                );
                return;
            }
        };
        self.registry.reconcile(&declared);

        // One capture moment for the whole cycle; batch order is the stable
        // pool-name order from the registry.
        let timestamp = epoch_millis();
        let mut events = Vec::new();
        let mut included = Vec::new();
        for pool in self.registry.iter_mut() {
            match pool.fetch_and_delta(self.source.as_ref()).await {
                Ok(snapshot) => match serde_json::to_string(&snapshot) {
                    Ok(message) => {
                        events.push(InputLogEvent { timestamp, message });
                        included.push(pool.name().to_string());
                    }
                    Err(err) => {
                        warn!(pool = %pool.name(), error = %err, "unable to serialize status snapshot");
                    }
                },
                Err(err) => {
                    warn!(pool = %pool.name(), error = %err, "unable to fetch pool status");
                }
            }
        }
        if events.is_empty() {
            warn!("no events built");
            return;
        }

        match self
            .appender
            .append_batch(self.store.as_ref(), &mut self.tokens, &events)
            .await
        {
            AppendOutcome::Delivered => {
                // Only pools whose event made the batch advance their
                // baseline; failed pools recompute against the old one.
                for name in &included {
                    if let Some(pool) = self.registry.get_mut(name) {
                        if let Err(err) = pool.commit() {
                            error!(pool = %name, error = %err, "commit without staged status");
                        }
                    }
                }
            }
            AppendOutcome::Conflict => {
                // The interval is dropped on purpose; recover the token and
                // carry on with the next cycle's fresh batch.
                if let Err(err) = self.resolve_token().await {
                    warn!(error = %err, "sequence token re-resolution gave up");
                }
            }
            AppendOutcome::Failed(PutEventsError::StreamNotFound(_)) => {
                // The stream vanished underneath us (e.g. retention expiry).
                // Resolution recreates it and recovers the token; the batch
                // is refetched next cycle like any other failed append.
                warn!(
                    group = %self.appender.group(),
                    stream = %self.appender.stream(),
                    "stream missing, re-resolving"
                );
                if let Err(err) = self.resolve_token().await {
                    warn!(error = %err, "sequence token re-resolution gave up");
                }
            }
            AppendOutcome::Failed(err) => {
                warn!(error = %err, "unable to put log events");
            }
            AppendOutcome::Skipped => {}
        }
    }
}

/// Whole-second capture time in epoch milliseconds, shared by every event
/// in a cycle.
fn epoch_millis() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs() as i64 * 1000
}
