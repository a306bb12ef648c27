//! Worker-pool status shipper
//!
//! Polls per-pool status endpoints on a local agent, computes per-interval
//! counter deltas, and appends one event per pool per cycle to an append-only
//! log stream guarded by a sequence token. Delta state only advances after a
//! cycle's batch lands, so an uncommitted interval is refetched rather than
//! lost or double-counted.

pub mod appender;
pub mod config;
pub mod error;
pub mod identity;
pub mod pool;
pub mod poller;
pub mod registry;
pub mod status;
pub mod token;

pub use appender::{AppendOutcome, LogAppender};
pub use config::{Config, RetryPolicy};
pub use error::{ConfigError, FetchError, IdentityError, PoolListError, StateError};
pub use pool::{PoolTracker, TRACKED_COUNTERS};
pub use poller::PollLoop;
pub use registry::PoolRegistry;
pub use status::{HttpStatusSource, RawStatus, StatusSource};
pub use token::{ResolveError, SequenceTokenStore};
