//! Error types for the shipper
//!
//! Containment policy: per-pool errors stay inside the cycle, cycle errors
//! stay inside the loop. Only startup failures (configuration, identity)
//! terminate the process.

use thiserror::Error;

/// Per-pool status fetch failures. Recoverable: the pool is skipped for the
/// cycle and refetched on the next one.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("status request failed: {0}")]
    Request(String),

    #[error("status endpoint returned {status}")]
    Status { status: u16 },

    #[error("malformed status payload: {0}")]
    Malformed(String),
}

/// Commit called without a staged fetch. Invariant violation; logged as a
/// bug rather than crashing the loop.
#[derive(Debug, Error)]
#[error("no staged status to commit for pool {pool}")]
pub struct StateError {
    pub pool: String,
}

/// Startup configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
}

/// Stream-identity resolution failures.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("container metadata not ready after {attempts} attempts")]
    MetadataExhausted { attempts: u32 },

    #[error("container metadata is missing task or container identity")]
    MetadataIncomplete,

    #[error("hostname could not be resolved")]
    Hostname,
}

/// Pool list file failures. Aborts the cycle, never the process; the
/// previously tracked pool set is retained.
#[derive(Debug, Error)]
pub enum PoolListError {
    #[error("failed to read pool list: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed pool list line {line_no}: {line:?}")]
    Malformed { line_no: usize, line: String },
}
