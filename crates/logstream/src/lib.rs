//! Log-stream target surface for the poolwatch shipper
//!
//! This crate defines the contract the shipper appends through: list streams
//! by prefix within a group, create a stream, and append a batch of events
//! using an optional prior sequence token. Two implementations are provided:
//! an in-memory store mirroring the production API for tests, and an HTTP
//! JSON client for a real ingestion endpoint.

pub mod event;
pub mod http;
pub mod memory;
pub mod store;

pub use event::{InputLogEvent, SequenceToken, StreamInfo};
pub use http::HttpLogStore;
pub use memory::MemoryLogStore;
pub use store::{PutEventsError, StoreError, StreamStore};
