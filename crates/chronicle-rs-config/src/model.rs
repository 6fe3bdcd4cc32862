//! Configuration schema for Chronicle memory.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root memory config.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MemoryConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl MemoryConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> MemoryConfigBuilder {
        MemoryConfigBuilder::new()
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let backend = &self.backend;
        if backend.timeout_secs == 0 {
            return Err(invalid("backend.timeout_secs", "must be greater than zero"));
        }
        if backend.provider == BackendProvider::Http {
            let Some(base_url) = backend.base_url.as_deref() else {
                return Err(invalid("backend.base_url", "required for http provider"));
            };
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(invalid("backend.base_url", "expected http(s) url"));
            }
        }
        if backend
            .api_key_env
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(invalid("backend.api_key_env", "must not be empty"));
        }
        if backend
            .path
            .as_deref()
            .is_some_and(|path| path.trim().is_empty())
        {
            return Err(invalid("backend.path", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(path: &str, message: &str) -> ConfigError {
    ConfigError::InvalidField {
        path: path.to_string(),
        message: message.to_string(),
    }
}

/// Builder for assembling a `MemoryConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigBuilder {
    config: MemoryConfig,
}

impl MemoryConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: MemoryConfig::default(),
        }
    }

    /// Replace the backend configuration.
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.config.backend = backend;
        self
    }

    /// Replace the retrieval configuration.
    pub fn retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.config.retrieval = retrieval;
        self
    }

    /// Finalize and return the built `MemoryConfig`.
    pub fn build(self) -> MemoryConfig {
        self.config
    }
}

/// Which memory backend to talk to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Remote memory service over HTTP.
    Http,
    /// Local JSONL files.
    #[default]
    File,
    /// Offline: every call fails and degrades to an empty result.
    Disabled,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    #[serde(default)]
    pub provider: BackendProvider,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the bearer token.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: BackendProvider::default(),
            base_url: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            path: None,
        }
    }
}

impl BackendConfig {
    /// Root directory for the file provider, falling back to the platform
    /// data directory.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(PathBuf::from(path));
        }
        directories::ProjectDirs::from("dev", "chronicle", "chronicle")
            .map(|dirs| dirs.data_dir().join("memory"))
    }
}

/// Default HTTP timeout in seconds.
fn default_timeout_secs() -> u64 {
    30
}

/// Default result limits for recall queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrievalConfig {
    #[serde(default = "default_character_limit")]
    pub character_limit: usize,
    #[serde(default = "default_world_limit")]
    pub world_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            character_limit: default_character_limit(),
            world_limit: default_world_limit(),
        }
    }
}

/// Default number of character memories to recall.
fn default_character_limit() -> usize {
    5
}

/// Default number of world memories to recall.
fn default_world_limit() -> usize {
    10
}
