use async_trait::async_trait;
use chronicle_rs_memory::{
    BackendError, MemoryBackend, SearchHit, SearchRequest, SearchResponse, WriteRequest,
    WriteResponse,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A record held by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub id: String,
    pub request: WriteRequest,
}

/// Multi-container backend double. Search returns newest entries first.
#[derive(Default)]
pub struct InMemoryBackend {
    entries: Mutex<Vec<StoredEntry>>,
    searches: Mutex<Vec<SearchRequest>>,
    ignore_limit: bool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return every matching entry regardless of the requested limit.
    pub fn ignoring_limit() -> Self {
        Self {
            ignore_limit: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<StoredEntry> {
        self.entries.lock().clone()
    }

    pub fn entries_in(&self, container_tag: &str) -> Vec<StoredEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.request.container_tag == container_tag)
            .cloned()
            .collect()
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().clone()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, BackendError> {
        let mut entries = self.entries.lock();
        let id = format!("mem-{}", entries.len() + 1);
        entries.push(StoredEntry {
            id: id.clone(),
            request,
        });
        Ok(WriteResponse { id })
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, BackendError> {
        self.searches.lock().push(request.clone());
        let limit = if self.ignore_limit {
            usize::MAX
        } else {
            request.limit
        };
        let results = self
            .entries
            .lock()
            .iter()
            .rev()
            .filter(|entry| entry.request.container_tag == request.container_tag)
            .filter_map(|entry| {
                let metadata = serde_json::to_value(&entry.request.metadata).ok()?;
                let matched = request
                    .filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(&metadata));
                matched.then(|| SearchHit {
                    memory: entry.request.content.clone(),
                    metadata: Some(metadata),
                })
            })
            .take(limit)
            .collect();
        Ok(SearchResponse { results })
    }
}

/// Backend whose every call fails, counting attempts.
pub struct FailingBackend {
    status: Option<u16>,
    calls: AtomicUsize,
}

impl FailingBackend {
    /// Fail with a transport error, as on a dropped connection.
    pub fn network() -> Self {
        Self {
            status: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail with a non-success status.
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> BackendError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) => BackendError::Status {
                status,
                body: "simulated failure".to_string(),
            },
            None => BackendError::Transport("simulated network failure".to_string()),
        }
    }
}

#[async_trait]
impl MemoryBackend for FailingBackend {
    async fn write(&self, _request: WriteRequest) -> Result<WriteResponse, BackendError> {
        Err(self.fail())
    }

    async fn search(&self, _request: SearchRequest) -> Result<SearchResponse, BackendError> {
        Err(self.fail())
    }
}

/// Backend that panics mid-call.
#[derive(Default)]
pub struct PanickingBackend;

#[async_trait]
impl MemoryBackend for PanickingBackend {
    async fn write(&self, _request: WriteRequest) -> Result<WriteResponse, BackendError> {
        panic!("backend exploded during write");
    }

    async fn search(&self, _request: SearchRequest) -> Result<SearchResponse, BackendError> {
        panic!("backend exploded during search");
    }
}
