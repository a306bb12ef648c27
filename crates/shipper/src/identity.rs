//! Stream identity resolution
//!
//! Resolved once per process lifetime: an explicit override wins, then a
//! container metadata file (polled until it reports ready), then the local
//! hostname.

use crate::config::RetryPolicy;
use crate::error::IdentityError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

const READY_STATUS: &str = "READY";

static TASK_ARN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+:task/(?:(?P<cluster>[a-zA-Z0-9-]+)/)?(?P<id>.+)$")
        .expect("task ARN pattern is valid")
});

#[derive(Debug, Deserialize)]
struct ContainerMetadata {
    #[serde(rename = "MetadataFileStatus", default)]
    status: String,

    #[serde(rename = "Cluster", default)]
    cluster: String,

    #[serde(rename = "TaskARN", default)]
    task_arn: String,

    #[serde(rename = "ContainerName", default)]
    container_name: String,
}

/// Resolves the stream name for this process instance.
pub async fn resolve_stream_name(
    override_name: Option<&str>,
    metadata_file: Option<&Path>,
    retry: RetryPolicy,
) -> Result<String, IdentityError> {
    if let Some(name) = override_name {
        return Ok(name.to_string());
    }
    if let Some(path) = metadata_file {
        return stream_name_from_metadata(path, retry).await;
    }
    hostname()
}

/// Polls the container metadata file until it reports ready, then combines
/// cluster, container name, and task id into the stream name.
async fn stream_name_from_metadata(
    path: &Path,
    retry: RetryPolicy,
) -> Result<String, IdentityError> {
    let mut attempts = 0u32;
    loop {
        match read_metadata(path).await {
            Ok(metadata) if metadata.status == READY_STATUS => {
                return stream_name_from(&metadata);
            }
            Ok(_) => {
                info!(file = %path.display(), "waiting for container metadata");
            }
            Err(err) => {
                warn!(file = %path.display(), error = %err, "unable to read container metadata");
            }
        }
        attempts += 1;
        if retry.exhausted(attempts) {
            return Err(IdentityError::MetadataExhausted { attempts });
        }
        tokio::time::sleep(retry.delay).await;
    }
}

async fn read_metadata(
    path: &Path,
) -> Result<ContainerMetadata, Box<dyn std::error::Error + Send + Sync>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

fn stream_name_from(metadata: &ContainerMetadata) -> Result<String, IdentityError> {
    let task_id = TASK_ARN_RE
        .captures(&metadata.task_arn)
        .and_then(|captures| captures.name("id"))
        .map(|m| m.as_str().to_string())
        .ok_or(IdentityError::MetadataIncomplete)?;
    if metadata.container_name.is_empty() {
        return Err(IdentityError::MetadataIncomplete);
    }
    Ok(format!(
        "{}/{}/{}",
        metadata.cluster, metadata.container_name, task_id
    ))
}

/// Hostname fallback: `HOSTNAME` from the environment, else `/etc/hostname`.
fn hostname() -> Result<String, IdentityError> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        let name = name.trim().to_string();
        if !name.is_empty() {
            return Ok(name);
        }
    }
    let contents = std::fs::read_to_string("/etc/hostname").map_err(|_| IdentityError::Hostname)?;
    let name = contents.trim().to_string();
    if name.is_empty() {
        return Err(IdentityError::Hostname);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn metadata(status: &str) -> String {
        format!(
            r#"{{
                "MetadataFileStatus": "{status}",
                "Cluster": "prod",
                "TaskARN": "arn:aws:ecs:us-east-1:123456789:task/prod/abcdef123456",
                "ContainerName": "web"
            }}"#
        )
    }

    #[tokio::test]
    async fn override_wins_over_everything() {
        let name = resolve_stream_name(
            Some("explicit"),
            None,
            RetryPolicy::bounded(Duration::from_millis(1), 1),
        )
        .await
        .unwrap();
        assert_eq!(name, "explicit");
    }

    #[tokio::test]
    async fn ready_metadata_yields_combined_label() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", metadata("READY")).unwrap();
        file.flush().unwrap();

        let name = resolve_stream_name(
            None,
            Some(file.path()),
            RetryPolicy::bounded(Duration::from_millis(1), 3),
        )
        .await
        .unwrap();
        assert_eq!(name, "prod/web/abcdef123456");
    }

    #[tokio::test]
    async fn unready_metadata_exhausts_bounded_policy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", metadata("INITIALIZING")).unwrap();
        file.flush().unwrap();

        let err = resolve_stream_name(
            None,
            Some(file.path()),
            RetryPolicy::bounded(Duration::from_millis(1), 2),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            IdentityError::MetadataExhausted { attempts: 2 }
        ));
    }

    #[test]
    fn unparseable_task_arn_is_rejected() {
        let metadata = ContainerMetadata {
            status: READY_STATUS.to_string(),
            cluster: "prod".to_string(),
            task_arn: "not-an-arn".to_string(),
            container_name: "web".to_string(),
        };
        assert!(matches!(
            stream_name_from(&metadata),
            Err(IdentityError::MetadataIncomplete)
        ));
    }

    #[test]
    fn task_arn_without_cluster_segment_still_parses() {
        let metadata = ContainerMetadata {
            status: READY_STATUS.to_string(),
            cluster: "prod".to_string(),
            task_arn: "arn:aws:ecs:us-east-1:123456789:task/abcdef123456".to_string(),
            container_name: "web".to_string(),
        };
        assert_eq!(
            stream_name_from(&metadata).unwrap(),
            "prod/web/abcdef123456"
        );
    }
}
