//! Memory backend interface and implementations.
//!
//! A backend accepts `{content, containerTag, metadata}` writes and answers
//! relevance queries scoped to a single container. Ranking is entirely the
//! backend's concern.

mod file;
mod http;

pub use file::FileMemoryBackend;
pub use http::HttpMemoryBackend;

use crate::error::BackendError;
use crate::filter::FilterPredicate;
use crate::metadata::Metadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a `POST memories` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    pub content: String,
    pub container_tag: String,
    pub metadata: Metadata,
}

/// Successful write answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub id: String,
}

/// Body of a `POST search` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub q: String,
    pub container_tag: String,
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterPredicate>,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub memory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Successful search answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

#[async_trait]
/// Narrow interface every memory store is reached through.
pub trait MemoryBackend: Send + Sync {
    /// Persist one record and return its backend-assigned id.
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, BackendError>;

    /// Return up to `request.limit` hits from `request.container_tag` only.
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, BackendError>;
}

/// Backend used while the application is offline. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl MemoryBackend for DisabledBackend {
    async fn write(&self, _request: WriteRequest) -> Result<WriteResponse, BackendError> {
        Err(BackendError::Offline)
    }

    async fn search(&self, _request: SearchRequest) -> Result<SearchResponse, BackendError> {
        Err(BackendError::Offline)
    }
}
