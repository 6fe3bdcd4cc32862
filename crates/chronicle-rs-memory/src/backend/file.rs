//! File-backed memory backend storing JSONL records per container.

use super::{MemoryBackend, SearchHit, SearchRequest, SearchResponse, WriteRequest, WriteResponse};
use crate::error::{BackendError, MemoryError};
use crate::metadata::Metadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Persisted record line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct StoredRecord {
    id: Uuid,
    container_tag: String,
    content: String,
    metadata: Metadata,
    created_at: DateTime<Utc>,
}

/// In-process backend that ranks hits by query-token overlap.
#[derive(Debug)]
pub struct FileMemoryBackend {
    /// Root directory for container files.
    root: PathBuf,
    /// Serializes file access so concurrent writes never interleave lines.
    lock: Mutex<()>,
}

impl FileMemoryBackend {
    /// Create a new file-backed backend under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!("initialized file memory backend (root={})", root.display());
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    /// Path to the container JSONL file.
    fn container_path(&self, container_tag: &str) -> PathBuf {
        let name: String = container_tag
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{name}.jsonl"))
    }

    /// Load all records for a container.
    ///
    /// Sanitized file names can collide, so records are matched on their
    /// exact tag as well.
    fn load_records(&self, container_tag: &str) -> Result<Vec<StoredRecord>, BackendError> {
        let _guard = self.lock.lock();
        let path = self.container_path(container_tag);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredRecord = serde_json::from_str(&line)?;
            if record.container_tag == container_tag {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl MemoryBackend for FileMemoryBackend {
    /// Store a record by appending to the container file.
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, BackendError> {
        let record = StoredRecord {
            id: Uuid::new_v4(),
            container_tag: request.container_tag,
            content: request.content,
            metadata: request.metadata,
            created_at: Utc::now(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        {
            let _guard = self.lock.lock();
            let path = self.container_path(&record.container_tag);
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(line.as_bytes())?;
        }
        debug!(
            "stored memory record (container={}, type={}, content_len={})",
            record.container_tag,
            record.metadata.content_type,
            record.content.len()
        );
        Ok(WriteResponse {
            id: record.id.to_string(),
        })
    }

    /// Rank container records against the query.
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, BackendError> {
        let records = self.load_records(&request.container_tag)?;
        let query_tokens = tokenize(&request.q);
        let mut scored = Vec::new();
        for record in records {
            let metadata = serde_json::to_value(&record.metadata)?;
            if let Some(filter) = &request.filter
                && !filter.matches(&metadata)
            {
                continue;
            }
            let score = overlap_score(&query_tokens, &tokenize(&record.content));
            scored.push((score, record.created_at, record.content, metadata));
        }
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.1.cmp(&a.1))
        });
        let results: Vec<SearchHit> = scored
            .into_iter()
            .take(request.limit)
            .map(|(_, _, memory, metadata)| SearchHit {
                memory,
                metadata: Some(metadata),
            })
            .collect();
        debug!(
            "searched memory (container={}, returned={})",
            request.container_tag,
            results.len()
        );
        Ok(SearchResponse { results })
    }
}

/// Lowercased alphanumeric words.
fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Share of query tokens present in the candidate.
fn overlap_score(query: &BTreeSet<String>, candidate: &BTreeSet<String>) -> f32 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    query.intersection(candidate).count() as f32 / query.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterRequest, build_filter};
    use crate::format::GameTime;
    use crate::metadata::{ContentType, MetadataFields, build_metadata};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn update(container: &str, content: &str, game_time: i64) -> WriteRequest {
        WriteRequest {
            content: content.to_string(),
            container_tag: container.to_string(),
            metadata: build_metadata(
                ContentType::WorldStateUpdate,
                MetadataFields {
                    game_time: Some(GameTime::new(game_time, "Day")),
                    ..MetadataFields::default()
                },
            )
            .expect("metadata"),
        }
    }

    fn search(container: &str, q: &str, limit: usize) -> SearchRequest {
        SearchRequest {
            q: q.to_string(),
            container_tag: container.to_string(),
            limit,
            filter: None,
        }
    }

    #[tokio::test]
    async fn write_assigns_distinct_ids() {
        let temp = tempdir().expect("tempdir");
        let backend = FileMemoryBackend::new(temp.path()).expect("backend");
        let a = backend.write(update("s-world", "one", 1)).await.expect("a");
        let b = backend.write(update("s-world", "two", 2)).await.expect("b");
        assert!(!a.id.is_empty());
        assert!(a.id != b.id);
    }

    #[tokio::test]
    async fn search_ranks_by_overlap_and_caps_limit() {
        let temp = tempdir().expect("tempdir");
        let backend = FileMemoryBackend::new(temp.path()).expect("backend");
        backend
            .write(update("s-world", "The dragon attacked the village", 1))
            .await
            .expect("write");
        backend
            .write(update("s-world", "Bread prices rose at the market", 2))
            .await
            .expect("write");
        backend
            .write(update("s-world", "The dragon flew north", 3))
            .await
            .expect("write");

        let response = backend
            .search(search("s-world", "dragon village", 2))
            .await
            .expect("search");
        let memories: Vec<_> = response.results.iter().map(|hit| hit.memory.as_str()).collect();
        assert_eq!(
            memories,
            vec!["The dragon attacked the village", "The dragon flew north"]
        );
    }

    #[tokio::test]
    async fn search_never_crosses_containers() {
        let temp = tempdir().expect("tempdir");
        let backend = FileMemoryBackend::new(temp.path()).expect("backend");
        backend.write(update("s-a/b", "secret of a", 1)).await.expect("write");
        backend.write(update("s-a_b", "secret of other", 1)).await.expect("write");

        let response = backend.search(search("s-a/b", "secret", 10)).await.expect("search");
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].memory, "secret of a");

        let empty = backend.search(search("s-c", "secret", 10)).await.expect("search");
        assert!(empty.results.is_empty());
    }

    #[tokio::test]
    async fn search_applies_filter() {
        let temp = tempdir().expect("tempdir");
        let backend = FileMemoryBackend::new(temp.path()).expect("backend");
        for day in 1..=5 {
            backend
                .write(update("s-world", &format!("event {day}"), day))
                .await
                .expect("write");
        }
        let mut request = search("s-world", "event", 10);
        request.filter = Some(build_filter(&FilterRequest {
            game_time_gte: Some(2),
            game_time_lte: Some(3),
            ..FilterRequest::default()
        }));
        let response = backend.search(request).await.expect("search");
        let mut memories: Vec<_> = response.results.into_iter().map(|hit| hit.memory).collect();
        memories.sort();
        assert_eq!(memories, vec!["event 2", "event 3"]);
    }

    #[test]
    fn overlap_score_handles_empty_sets() {
        assert_eq!(overlap_score(&BTreeSet::new(), &tokenize("a b")), 0.0);
        assert_eq!(overlap_score(&tokenize("a b"), &tokenize("b c")), 0.5);
    }
}
