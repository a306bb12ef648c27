//! HTTP JSON client for a log-stream ingestion service
//!
//! Translates the `StreamStore` contract into JSON POST requests against a
//! base endpoint. Status mapping keeps the recovery-relevant distinction
//! intact: 409 is an ordering conflict, 404 a missing stream, 400 a bad
//! request, and everything else (transport failures, throttling, 5xx) is
//! transient.

use crate::event::{InputLogEvent, SequenceToken, StreamInfo};
use crate::store::{PutEventsError, StoreError, StreamStore};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DESCRIBE_STREAMS_PATH: &str = "/v1/describe-streams";
const CREATE_STREAM_PATH: &str = "/v1/create-stream";
const PUT_EVENTS_PATH: &str = "/v1/put-events";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation of `StreamStore`.
#[derive(Debug, Clone)]
pub struct HttpLogStore {
    client: Client,
    endpoint: String,
}

impl HttpLogStore {
    /// Creates a store client targeting the provided base endpoint (e.g.
    /// `http://logs.internal:9000`).
    pub fn new(endpoint: impl Into<String>) -> Result<Self, StoreError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(StoreError::InvalidRequest(
                "log-stream endpoint must not be empty".into(),
            ));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| StoreError::Transient(format!("http client build failed: {err}")))?;
        Ok(Self { client, endpoint })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response, String> {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|err| format!("{path} request failed: {err}"))
    }
}

#[async_trait]
impl StreamStore for HttpLogStore {
    async fn describe_streams(
        &self,
        group: &str,
        prefix: &str,
    ) -> Result<Vec<StreamInfo>, StoreError> {
        let request = WireDescribeRequest { group, prefix };
        let response = self
            .post(DESCRIBE_STREAMS_PATH, &request)
            .await
            .map_err(StoreError::Transient)?;
        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(StoreError::InvalidRequest(body_text(response).await));
        }
        if !status.is_success() {
            return Err(StoreError::Transient(format!(
                "describe-streams returned status {status}"
            )));
        }
        let wire: WireDescribeResponse = response
            .json()
            .await
            .map_err(|err| StoreError::Transient(format!("describe-streams decode failed: {err}")))?;
        Ok(wire
            .streams
            .into_iter()
            .map(|stream| StreamInfo {
                name: stream.name,
                upload_sequence_token: stream.sequence_token.map(SequenceToken::new),
            })
            .collect())
    }

    async fn create_stream(&self, group: &str, stream: &str) -> Result<(), StoreError> {
        let request = WireCreateRequest { group, stream };
        let response = self
            .post(CREATE_STREAM_PATH, &request)
            .await
            .map_err(StoreError::Transient)?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(StoreError::StreamAlreadyExists(stream.to_string())),
            StatusCode::BAD_REQUEST => Err(StoreError::InvalidRequest(body_text(response).await)),
            status => Err(StoreError::Transient(format!(
                "create-stream returned status {status}"
            ))),
        }
    }

    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        token: Option<&SequenceToken>,
        events: &[InputLogEvent],
    ) -> Result<SequenceToken, PutEventsError> {
        let request = WirePutRequest {
            group,
            stream,
            // Omitted entirely for first-write semantics.
            sequence_token: token.map(SequenceToken::as_str),
            events,
        };
        let response = self
            .post(PUT_EVENTS_PATH, &request)
            .await
            .map_err(PutEventsError::Transient)?;
        match response.status() {
            status if status.is_success() => {
                let wire: WirePutResponse = response.json().await.map_err(|err| {
                    PutEventsError::Transient(format!("put-events decode failed: {err}"))
                })?;
                Ok(SequenceToken::new(wire.next_sequence_token))
            }
            StatusCode::CONFLICT => {
                let expected = response
                    .json::<WireConflictResponse>()
                    .await
                    .ok()
                    .and_then(|wire| wire.expected_sequence_token)
                    .map(SequenceToken::new);
                Err(PutEventsError::SequenceConflict { expected })
            }
            StatusCode::NOT_FOUND => Err(PutEventsError::StreamNotFound(stream.to_string())),
            StatusCode::BAD_REQUEST => {
                Err(PutEventsError::InvalidRequest(body_text(response).await))
            }
            status => Err(PutEventsError::Transient(format!(
                "put-events returned status {status}"
            ))),
        }
    }
}

async fn body_text(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|err| format!("unreadable response body: {err}"))
}

#[derive(Debug, Serialize)]
struct WireDescribeRequest<'a> {
    group: &'a str,
    prefix: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireDescribeResponse {
    #[serde(default)]
    streams: Vec<WireStreamInfo>,
}

#[derive(Debug, Deserialize)]
struct WireStreamInfo {
    name: String,
    #[serde(default)]
    sequence_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireCreateRequest<'a> {
    group: &'a str,
    stream: &'a str,
}

#[derive(Debug, Serialize)]
struct WirePutRequest<'a> {
    group: &'a str,
    stream: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_token: Option<&'a str>,
    events: &'a [InputLogEvent],
}

#[derive(Debug, Deserialize)]
struct WirePutResponse {
    next_sequence_token: String,
}

#[derive(Debug, Deserialize)]
struct WireConflictResponse {
    #[serde(default)]
    expected_sequence_token: Option<String>,
}
