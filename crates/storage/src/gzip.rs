//! Gzip decompression over another driver
//!
//! [`GzipDriver`] wraps any [`FileReadDriver`] and yields the decompressed
//! bytes of the objects it reads. Output is still bounded by the caller's
//! chunk size; surplus decompressed bytes wait for the next call.

use std::any::Any;
use std::io::Write;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::GzDecoder;
use storage_core::{Error, Result};
use tracing::{debug, instrument};

use crate::{FileReadDriver, FileReadHandle};

/// Read driver that gunzips the stream of an inner driver
#[derive(Debug)]
pub struct GzipDriver {
    inner: Box<dyn FileReadDriver>,
}

impl GzipDriver {
    /// Wrap `inner`
    pub fn new<D: FileReadDriver>(inner: D) -> Self {
        Self::from_boxed(Box::new(inner))
    }

    /// Wrap an already boxed driver
    pub fn from_boxed(inner: Box<dyn FileReadDriver>) -> Self {
        Self { inner }
    }

    /// The wrapped driver
    pub fn inner(&self) -> &dyn FileReadDriver {
        self.inner.as_ref()
    }
}

#[async_trait]
impl FileReadDriver for GzipDriver {
    fn kind(&self) -> &'static str {
        "gzip"
    }

    #[instrument(skip(self), fields(backend = "gzip", inner = self.inner.kind()))]
    async fn open(&mut self, name: &str) -> Result<Box<dyn FileReadHandle>> {
        let inner = self.inner.open(name).await?;
        debug!("Opened compressed stream");

        Ok(Box::new(GzipReadHandle {
            name: name.to_string(),
            inner,
            decoder: GzDecoder::new(Vec::new()),
            pending: Bytes::new(),
            inner_eof: false,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct GzipReadHandle {
    name: String,
    inner: Box<dyn FileReadHandle>,
    decoder: GzDecoder<Vec<u8>>,
    /// Decompressed bytes not yet handed out
    pending: Bytes,
    inner_eof: bool,
}

impl GzipReadHandle {
    fn decode(&mut self, compressed: &[u8]) -> Result<()> {
        self.decoder
            .write_all(compressed)
            .and_then(|_| self.decoder.flush())
            .map_err(|e| Error::from_io(&self.name, e))
    }

    fn finish(&mut self) -> Result<()> {
        self.decoder
            .try_finish()
            .map_err(|e| Error::from_io(&self.name, e))
    }
}

#[async_trait]
impl FileReadHandle for GzipReadHandle {
    async fn read_chunk(&mut self, max_size: usize) -> Result<Option<Bytes>> {
        if max_size == 0 {
            return Ok(None);
        }

        loop {
            if !self.pending.is_empty() {
                let size = max_size.min(self.pending.len());
                return Ok(Some(self.pending.split_to(size)));
            }
            if self.inner_eof {
                return Ok(None);
            }

            match self.inner.read_chunk(max_size).await? {
                Some(compressed) => self.decode(&compressed)?,
                None => {
                    self.finish()?;
                    self.inner_eof = true;
                }
            }
            self.pending = Bytes::from(std::mem::take(self.decoder.get_mut()));
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.pending = Bytes::new();
        self.inner.close().await
    }
}
