//! Local filesystem read driver
//!
//! Resolves object names under a base directory and streams them with
//! `tokio::fs`.

use std::any::Any;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use storage_core::{Error, Result};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};

use crate::{FileReadDriver, FileReadHandle};

/// Local filesystem read driver
#[derive(Debug, Clone)]
pub struct LocalDriver {
    /// Base path for all object names
    base_path: PathBuf,
}

impl LocalDriver {
    /// Create a new LocalDriver instance
    ///
    /// # Arguments
    /// * `base_path` - Directory object names are resolved against
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve an object name to a filesystem path
    fn resolve_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }
}

#[async_trait]
impl FileReadDriver for LocalDriver {
    fn kind(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn open(&mut self, name: &str) -> Result<Box<dyn FileReadHandle>> {
        let full_path = self.resolve_path(name);
        debug!(?full_path, "Opening file");

        let file = File::open(&full_path)
            .await
            .map_err(|e| Error::from_io(name, e))?;

        let metadata = file.metadata().await.map_err(|e| Error::from_io(name, e))?;
        if metadata.is_dir() {
            return Err(Error::io(name, format!("{:?} is a directory", full_path)));
        }

        Ok(Box::new(LocalReadHandle {
            name: name.to_string(),
            file: Some(file),
            remaining: metadata.len(),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Open file descriptor for one object
struct LocalReadHandle {
    name: String,
    file: Option<File>,
    /// Bytes left according to the size seen at open; bounds the read buffer
    remaining: u64,
}

#[async_trait]
impl FileReadHandle for LocalReadHandle {
    async fn read_chunk(&mut self, max_size: usize) -> Result<Option<Bytes>> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::io(&self.name, "file handle already released"))?;

        // At least one byte so a file that grew since open still reads to EOF
        let hint = usize::try_from(self.remaining).unwrap_or(usize::MAX).max(1);
        let mut buf = BytesMut::zeroed(max_size.min(hint));
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| Error::from_io(&self.name, e))?;

        if read == 0 {
            return Ok(None);
        }
        self.remaining = self.remaining.saturating_sub(read as u64);
        buf.truncate(read);
        Ok(Some(buf.freeze()))
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the tokio file closes the descriptor
        if let Some(file) = self.file.take() {
            drop(file);
            debug!(name = %self.name, "File closed");
        }
        Ok(())
    }
}
