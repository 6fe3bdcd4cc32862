//! HTTP client for a remote memory service.

use super::{MemoryBackend, SearchRequest, SearchResponse, WriteRequest, WriteResponse};
use crate::error::BackendError;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Remote backend reached over `POST memories` and `POST search`.
#[derive(Debug, Clone)]
pub struct HttpMemoryBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMemoryBackend {
    /// Build a client; `timeout` bounds every request end to end.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(
            "initialized http memory backend (base_url={}, timeout_ms={}, auth={})",
            base_url,
            timeout.as_millis(),
            api_key.is_some()
        );
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self.client.post(format!("{}/{path}", self.base_url));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl MemoryBackend for HttpMemoryBackend {
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, BackendError> {
        debug!(
            "posting memory (container={}, content_len={})",
            request.container_tag,
            request.content.len()
        );
        let response = self
            .post("memories")
            .json(&request)
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        decode(response).await
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, BackendError> {
        debug!(
            "posting search (container={}, limit={}, filtered={})",
            request.container_tag,
            request.limit,
            request.filter.is_some()
        );
        let response = self
            .post("search")
            .json(&request)
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        decode(response).await
    }
}

/// Map non-2xx answers to `Status` and undecodable bodies to `Malformed`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| BackendError::Transport(err.to_string()))?;
    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|err| BackendError::Malformed(err.to_string()))
}
