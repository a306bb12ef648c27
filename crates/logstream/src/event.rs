//! Value types shared by every store implementation

use serde::{Deserialize, Serialize};

/// A single log event queued for appending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLogEvent {
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,

    /// Serialized payload.
    pub message: String,
}

/// Opaque append-ordering token for one stream. Single writer per token:
/// the value returned by an append is the only one the next append may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceToken(String);

impl SequenceToken {
    /// Wraps a raw token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value for wire requests.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stream directory entry returned by `describe_streams`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Stream name.
    pub name: String,

    /// Token expected by the next append; absent while the stream is empty.
    pub upload_sequence_token: Option<SequenceToken>,
}
