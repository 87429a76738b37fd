//! Read driver trait definitions
//!
//! Defines the async interface that every storage backend implements to
//! serve read streams. A driver prepares an object for reading and hands back
//! a [`FileReadHandle`] that owns the live backend resource.

use std::any::Any;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use storage_core::Result;

/// Async trait for read drivers
///
/// A driver is bound to exactly one read stream, which owns it for the
/// stream's lifetime.
#[async_trait]
pub trait FileReadDriver: Send + Sync + fmt::Debug + 'static {
    /// Short backend label used in logs ("local", "memory", "s3", ...)
    fn kind(&self) -> &'static str;

    /// Prepare `name` for reading
    ///
    /// Must not read any object bytes.
    ///
    /// # Errors
    /// - [`Error::NotFound`](storage_core::Error::NotFound) if the object does not exist
    /// - [`Error::PermissionDenied`](storage_core::Error::PermissionDenied) if access is refused
    /// - [`Error::Io`](storage_core::Error::Io) for any other backend failure
    async fn open(&mut self, name: &str) -> Result<Box<dyn FileReadHandle>>;

    /// Access the concrete driver for diagnostics
    fn as_any(&self) -> &dyn Any;
}

/// An open backend resource (file descriptor, response body, ...)
///
/// Dropping a handle without calling [`close`](FileReadHandle::close) must
/// still release the resource.
#[async_trait]
pub trait FileReadHandle: Send {
    /// Read the next chunk of at most `max_size` bytes
    ///
    /// Returns `Ok(None)` at end of stream. A returned chunk is never empty.
    async fn read_chunk(&mut self, max_size: usize) -> Result<Option<Bytes>>;

    /// Release the backend resource
    ///
    /// Called at most once by the read stream.
    async fn close(&mut self) -> Result<()>;
}
