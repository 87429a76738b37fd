//! Storage handle built from configuration
//!
//! [`Storage`] binds a configured backend and read defaults, and hands out a
//! fresh driver to every stream it creates.

use bytes::{Bytes, BytesMut};
use storage_core::{BackendConfig, Compression, Error, Result, StorageConfig};
use tracing::{debug, info, instrument};

use crate::{FileReadDriver, GzipDriver, LocalDriver, MemoryStore, StorageFileRead};

#[cfg(feature = "s3")]
use crate::s3::{S3Config, S3Driver};

#[derive(Debug, Clone)]
enum Backend {
    Local(LocalDriver),
    Memory(MemoryStore),
    #[cfg(feature = "s3")]
    S3(S3Driver),
}

/// Configured entry point for creating read streams
#[derive(Debug, Clone)]
pub struct Storage {
    backend: Backend,
    config: StorageConfig,
}

impl Storage {
    /// Build a storage handle from a validated configuration
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an invalid configuration and
    /// `StorageUnavailable` when the backend is not compiled in.
    pub async fn from_config(config: StorageConfig) -> Result<Self> {
        config.validate()?;

        let backend = match &config.backend {
            BackendConfig::Local { base_path } => Backend::Local(LocalDriver::new(base_path)),
            BackendConfig::Memory => Backend::Memory(MemoryStore::new()),
            BackendConfig::S3 { .. } => s3_backend(&config.backend).await?,
        };

        info!(
            backend = config.backend.label(),
            buffer_size = config.buffer_size,
            compression = ?config.compression,
            "Storage initialized"
        );
        Ok(Self { backend, config })
    }

    /// Local filesystem storage with default read settings
    pub fn local(base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        Self {
            backend: Backend::Local(LocalDriver::new(&base_path)),
            config: StorageConfig {
                backend: BackendConfig::Local { base_path },
                ..Default::default()
            },
        }
    }

    /// Storage over an existing in-memory store with default read settings
    pub fn memory(store: MemoryStore) -> Self {
        Self {
            backend: Backend::Memory(store),
            config: StorageConfig {
                backend: BackendConfig::Memory,
                ..Default::default()
            },
        }
    }

    /// Replace the read settings, keeping the backend
    pub fn with_read_settings(
        mut self,
        buffer_size: usize,
        ignore_missing: bool,
        compression: Compression,
    ) -> Self {
        self.config.buffer_size = buffer_size;
        self.config.ignore_missing = ignore_missing;
        self.config.compression = compression;
        self
    }

    /// Get configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// A new driver for one stream, wrapped for the configured compression
    fn driver(&self) -> Box<dyn FileReadDriver> {
        let driver: Box<dyn FileReadDriver> = match &self.backend {
            Backend::Local(local) => Box::new(local.clone()),
            Backend::Memory(store) => Box::new(store.driver()),
            #[cfg(feature = "s3")]
            Backend::S3(s3) => Box::new(s3.clone()),
        };

        match self.config.compression {
            Compression::None => driver,
            Compression::Gzip => Box::new(GzipDriver::from_boxed(driver)),
        }
    }

    /// Create a stream using the configured defaults
    pub fn new_read(&self, name: impl Into<String>) -> StorageFileRead {
        self.new_read_with(name, self.config.ignore_missing, self.config.buffer_size)
    }

    /// Create a stream with explicit policy and buffer size
    pub fn new_read_with(
        &self,
        name: impl Into<String>,
        ignore_missing: bool,
        buffer_size: usize,
    ) -> StorageFileRead {
        StorageFileRead::with_driver(name, ignore_missing, buffer_size, self.driver())
    }

    /// Create and open a stream, handing ownership to the caller
    ///
    /// Returns `None` when the object is missing and missing objects are
    /// ignored.
    pub async fn open_read(&self, name: impl Into<String>) -> Result<Option<StorageFileRead>> {
        let mut file = self.new_read(name);
        if file.open().await?.is_opened() {
            Ok(Some(file))
        } else {
            Ok(None)
        }
    }

    /// Read a whole object into memory
    ///
    /// Returns `None` when the object is missing and missing objects are
    /// ignored.
    #[instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<Option<Bytes>> {
        let Some(mut file) = self.open_read(name).await? else {
            debug!("Object missing, nothing to read");
            return Ok(None);
        };

        let mut data = BytesMut::new();
        while let Some(chunk) = file.read().await? {
            data.extend_from_slice(&chunk);
        }
        // A release failure is already logged and the data is complete
        let _ = file.close().await;

        debug!(size = data.len(), "Object read");
        Ok(Some(data.freeze()))
    }
}

#[cfg(feature = "s3")]
async fn s3_backend(config: &BackendConfig) -> Result<Backend> {
    let BackendConfig::S3 {
        bucket,
        prefix,
        endpoint,
        region,
        force_path_style,
    } = config
    else {
        return Err(Error::InvalidConfig {
            message: format!("expected s3 backend, got {}", config.label()),
        });
    };

    let driver = S3Driver::with_config(S3Config {
        bucket: bucket.clone(),
        prefix: prefix.clone(),
        endpoint_url: endpoint.clone(),
        region: region.clone(),
        force_path_style: *force_path_style,
    })
    .await;
    Ok(Backend::S3(driver))
}

#[cfg(not(feature = "s3"))]
async fn s3_backend(config: &BackendConfig) -> Result<Backend> {
    Err(Error::StorageUnavailable {
        backend: format!("{} (build with the `s3` feature)", config.label()),
    })
}
