//! JSON5 config loading with schema checks.

mod schema;


use crate::{ConfigError, MemoryConfig};
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::Path;

impl MemoryConfig {
    /// Load a config from a JSON5 file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a config from JSON5 contents.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }
}

fn config_from_value(value: Value, label: &str) -> Result<MemoryConfig, ConfigError> {
    schema::validate_schema(&value, label)?;
    let config: MemoryConfig = serde_json::from_value(value)?;
    config.validate()?;
    debug!(
        "loaded memory config (provider={:?}, character_limit={}, world_limit={})",
        config.backend.provider, config.retrieval.character_limit, config.retrieval.world_limit
    );
    Ok(config)
}
