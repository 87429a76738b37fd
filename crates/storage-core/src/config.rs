//! Storage configuration types

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, DEFAULT_BUFFER_SIZE};

/// Main storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend selection
    pub backend: BackendConfig,

    /// Requested chunk size for each read
    pub buffer_size: usize,

    /// Treat missing objects as empty instead of failing
    pub ignore_missing: bool,

    /// Transform applied on top of the backend stream
    pub compression: Compression,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            ignore_missing: false,
            compression: Compression::None,
        }
    }
}

impl StorageConfig {
    /// Parse a configuration from JSON text and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: StorageConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_json(&json)
    }

    /// Check the configuration for values no stream could use
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig {
                message: "buffer_size must be greater than zero".to_string(),
            });
        }

        match &self.backend {
            BackendConfig::Local { base_path } if base_path.is_empty() => {
                Err(Error::InvalidConfig {
                    message: "local backend requires a base_path".to_string(),
                })
            }
            BackendConfig::S3 { bucket, .. } if bucket.is_empty() => Err(Error::InvalidConfig {
                message: "s3 backend requires a bucket".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Storage backend type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Local filesystem rooted at `base_path`
    Local { base_path: String },

    /// Process-local in-memory store
    Memory,

    /// S3-compatible object store
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local {
            base_path: "./data".to_string(),
        }
    }
}

impl BackendConfig {
    /// Short backend label used in logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            BackendConfig::Local { .. } => "local",
            BackendConfig::Memory => "memory",
            BackendConfig::S3 { .. } => "s3",
        }
    }
}

/// Stream transform applied when reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Bytes are returned as stored
    #[default]
    None,

    /// Stored objects are gzip compressed and decompressed on read
    Gzip,
}
