//! poolwatch: polls worker-pool status endpoints on a local agent and ships
//! per-interval counter deltas to an append-only log stream.

use poolwatch_logstream::HttpLogStore;
use poolwatch_shipper::{identity, Config, HttpStatusSource, PollLoop};
use std::process;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run().await {
        eprintln!("fatal: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let stream_name = identity::resolve_stream_name(
        config.stream_name_override.as_deref(),
        config.metadata_file.as_deref(),
        config.metadata_retry,
    )
    .await?;
    info!(group = %config.log_group, stream = %stream_name, "starting shipper");

    let source = Arc::new(HttpStatusSource::new(config.agent_host.clone())?);
    let store = Arc::new(HttpLogStore::new(config.logstream_endpoint.clone())?);
    let mut poll_loop = PollLoop::new(config, source, store, stream_name);
    poll_loop.run().await?;
    Ok(())
}
