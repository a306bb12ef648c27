//! In-memory log-stream store
//!
//! Mirrors the production store API so the shipper can be exercised end to
//! end in tests: same token handshake, same ordering rules, no network.

use crate::event::{InputLogEvent, SequenceToken, StreamInfo};
use crate::store::{PutEventsError, StoreError, StreamStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct StreamState {
    events: Vec<InputLogEvent>,
    next_token: Option<SequenceToken>,
    appends: u64,
}

/// In-memory `StreamStore` implementation.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    groups: Mutex<HashMap<String, HashMap<String, StreamState>>>,
}

impl MemoryLogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events stored for a stream, in append order.
    pub fn events(&self, group: &str, stream: &str) -> Vec<InputLogEvent> {
        self.groups
            .lock()
            .get(group)
            .and_then(|streams| streams.get(stream))
            .map(|state| state.events.clone())
            .unwrap_or_default()
    }

    /// Token the stream currently expects from the next append.
    pub fn expected_token(&self, group: &str, stream: &str) -> Option<SequenceToken> {
        self.groups
            .lock()
            .get(group)
            .and_then(|streams| streams.get(stream))
            .and_then(|state| state.next_token.clone())
    }
}

#[async_trait]
impl StreamStore for MemoryLogStore {
    async fn describe_streams(
        &self,
        group: &str,
        prefix: &str,
    ) -> Result<Vec<StreamInfo>, StoreError> {
        let groups = self.groups.lock();
        let mut infos: Vec<StreamInfo> = groups
            .get(group)
            .map(|streams| {
                streams
                    .iter()
                    .filter(|(name, _)| name.starts_with(prefix))
                    .map(|(name, state)| StreamInfo {
                        name: name.clone(),
                        upload_sequence_token: state.next_token.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    async fn create_stream(&self, group: &str, stream: &str) -> Result<(), StoreError> {
        let mut groups = self.groups.lock();
        let streams = groups.entry(group.to_string()).or_default();
        if streams.contains_key(stream) {
            return Err(StoreError::StreamAlreadyExists(stream.to_string()));
        }
        streams.insert(stream.to_string(), StreamState::default());
        Ok(())
    }

    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        token: Option<&SequenceToken>,
        events: &[InputLogEvent],
    ) -> Result<SequenceToken, PutEventsError> {
        if events.is_empty() {
            return Err(PutEventsError::InvalidRequest("empty event batch".into()));
        }
        if events
            .windows(2)
            .any(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(PutEventsError::InvalidRequest(
                "event timestamps must be non-decreasing".into(),
            ));
        }

        let mut groups = self.groups.lock();
        let state = groups
            .get_mut(group)
            .and_then(|streams| streams.get_mut(stream))
            .ok_or_else(|| PutEventsError::StreamNotFound(stream.to_string()))?;

        if token != state.next_token.as_ref() {
            return Err(PutEventsError::SequenceConflict {
                expected: state.next_token.clone(),
            });
        }
        if let (Some(tail), Some(first)) = (state.events.last(), events.first()) {
            if first.timestamp < tail.timestamp {
                return Err(PutEventsError::InvalidRequest(
                    "event timestamps precede the stream tail".into(),
                ));
            }
        }

        state.events.extend_from_slice(events);
        state.appends += 1;
        let next = SequenceToken::new(format!("seq-{}", state.appends));
        state.next_token = Some(next.clone());
        Ok(next)
    }
}
