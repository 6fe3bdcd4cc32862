//! Config-driven construction of the memory services.

use crate::error::ChronicleCoreError;
use crate::observer::MemoryObserver;
use crate::retrieval::RetrievalService;
use crate::storage::StorageService;
use chronicle_rs_config::{BackendConfig, BackendProvider, ConfigError, MemoryConfig};
use chronicle_rs_memory::{
    DisabledBackend, FileMemoryBackend, HttpMemoryBackend, MemoryBackend, MemoryError,
};
use log::info;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Build the backend selected by `config`.
pub fn backend_from_config(
    config: &BackendConfig,
) -> Result<Arc<dyn MemoryBackend>, ChronicleCoreError> {
    match config.provider {
        BackendProvider::Http => {
            let base_url =
                config
                    .base_url
                    .as_deref()
                    .ok_or_else(|| ConfigError::InvalidField {
                        path: "backend.base_url".to_string(),
                        message: "required for http provider".to_string(),
                    })?;
            let api_key = match config.api_key_env.as_deref() {
                Some(name) => Some(
                    env::var(name)
                        .map_err(|_| ChronicleCoreError::MissingApiKey(name.to_string()))?,
                ),
                None => None,
            };
            let backend = HttpMemoryBackend::new(
                base_url,
                Duration::from_secs(config.timeout_secs),
                api_key,
            )
            .map_err(MemoryError::from)?;
            Ok(Arc::new(backend))
        }
        BackendProvider::File => {
            let root = config
                .resolved_path()
                .ok_or(ChronicleCoreError::MissingPath)?;
            Ok(Arc::new(FileMemoryBackend::new(root)?))
        }
        BackendProvider::Disabled => {
            info!("memory backend disabled; every call will degrade");
            Ok(Arc::new(DisabledBackend))
        }
    }
}

/// Storage and retrieval services sharing one backend and observer.
#[derive(Clone)]
pub struct MemoryServices {
    pub storage: StorageService,
    pub retrieval: RetrievalService,
}

impl MemoryServices {
    pub fn new(
        backend: Arc<dyn MemoryBackend>,
        observer: Option<Arc<dyn MemoryObserver>>,
    ) -> Self {
        Self {
            storage: StorageService::with_observer(backend.clone(), observer.clone()),
            retrieval: RetrievalService::with_observer(backend, observer),
        }
    }

    /// Validate `config`, build its backend and apply its retrieval limits.
    pub fn from_config(
        config: &MemoryConfig,
        observer: Option<Arc<dyn MemoryObserver>>,
    ) -> Result<Self, ChronicleCoreError> {
        config.validate()?;
        let backend = backend_from_config(&config.backend)?;
        let mut services = Self::new(backend, observer);
        services.retrieval = services
            .retrieval
            .with_limits(config.retrieval.character_limit, config.retrieval.world_limit);
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_variable_is_reported() {
        let config = BackendConfig {
            provider: BackendProvider::Http,
            base_url: Some("http://127.0.0.1:9".to_string()),
            api_key_env: Some("CHRONICLE_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..BackendConfig::default()
        };
        let err = backend_from_config(&config)
            .err()
            .expect("missing key should fail");
        assert!(matches!(
            err,
            ChronicleCoreError::MissingApiKey(name) if name == "CHRONICLE_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }

    #[test]
    fn http_without_base_url_is_a_config_error() {
        let config = BackendConfig {
            provider: BackendProvider::Http,
            ..BackendConfig::default()
        };
        let err = backend_from_config(&config)
            .err()
            .expect("missing base url should fail");
        assert!(matches!(err, ChronicleCoreError::Config(_)));
    }
}
