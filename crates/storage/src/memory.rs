//! In-memory storage driver
//!
//! Keeps objects in a shared process-local map. Intended for tests and
//! tooling: faults can be injected per object and the store counts live
//! handles and releases so resource leaks are observable.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use storage_core::{Error, Result};
use tracing::{debug, instrument};

use crate::{FileReadDriver, FileReadHandle};

/// Failure to inject for a given object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `open` fails with `PermissionDenied`
    DenyOpen,
    /// `open` fails with `Io`
    FailOpen,
    /// every `read_chunk` fails with `Io`
    FailRead,
    /// `close` releases the handle but reports `Io`
    FailClose,
}

#[derive(Debug, Default)]
struct Inner {
    objects: DashMap<String, Bytes>,
    faults: Mutex<HashMap<String, HashSet<Fault>>>,
    open_handles: AtomicUsize,
    releases: DashMap<String, usize>,
}

/// Shared in-memory object store
///
/// Cloning is cheap and every clone sees the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object
    pub fn put(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.inner.objects.insert(name.into(), data.into());
    }

    /// Remove an object, returning its contents
    pub fn remove(&self, name: &str) -> Option<Bytes> {
        self.inner.objects.remove(name).map(|(_, data)| data)
    }

    /// Check whether an object exists
    pub fn contains(&self, name: &str) -> bool {
        self.inner.objects.contains_key(name)
    }

    /// Inject a fault for `name`
    pub fn inject(&self, name: impl Into<String>, fault: Fault) {
        self.inner
            .faults
            .lock()
            .entry(name.into())
            .or_default()
            .insert(fault);
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        self.inner.faults.lock().clear();
    }

    /// Number of handles opened and not yet released
    pub fn open_handles(&self) -> usize {
        self.inner.open_handles.load(Ordering::SeqCst)
    }

    /// Number of explicit `close` calls that reached the store for `name`
    pub fn releases(&self, name: &str) -> usize {
        self.inner.releases.get(name).map(|n| *n).unwrap_or(0)
    }

    /// Create a driver bound to this store
    pub fn driver(&self) -> MemoryDriver {
        MemoryDriver {
            store: self.clone(),
        }
    }

    fn has_fault(&self, name: &str, fault: Fault) -> bool {
        self.inner
            .faults
            .lock()
            .get(name)
            .is_some_and(|faults| faults.contains(&fault))
    }
}

/// Read driver over a [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    store: MemoryStore,
}

impl MemoryDriver {
    /// The store this driver reads from
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl FileReadDriver for MemoryDriver {
    fn kind(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn open(&mut self, name: &str) -> Result<Box<dyn FileReadHandle>> {
        if self.store.has_fault(name, Fault::DenyOpen) {
            return Err(Error::PermissionDenied {
                name: name.to_string(),
                message: "access denied by injected fault".to_string(),
            });
        }
        if self.store.has_fault(name, Fault::FailOpen) {
            return Err(Error::io(name, "open failed by injected fault"));
        }

        let data = self
            .store
            .inner
            .objects
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;

        self.store.inner.open_handles.fetch_add(1, Ordering::SeqCst);
        debug!(size = data.len(), "Opened memory object");

        Ok(Box::new(MemoryReadHandle {
            fail_read: self.store.has_fault(name, Fault::FailRead),
            fail_close: self.store.has_fault(name, Fault::FailClose),
            store: self.store.clone(),
            name: name.to_string(),
            remaining: data,
            released: false,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MemoryReadHandle {
    store: MemoryStore,
    name: String,
    remaining: Bytes,
    fail_read: bool,
    fail_close: bool,
    released: bool,
}

impl MemoryReadHandle {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.store.inner.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl FileReadHandle for MemoryReadHandle {
    async fn read_chunk(&mut self, max_size: usize) -> Result<Option<Bytes>> {
        if self.fail_read {
            return Err(Error::io(&self.name, "read failed by injected fault"));
        }

        let size = max_size.min(self.remaining.len());
        if size == 0 {
            return Ok(None);
        }
        // Zero-copy: the chunk shares the stored buffer
        Ok(Some(self.remaining.split_to(size)))
    }

    async fn close(&mut self) -> Result<()> {
        self.release();
        *self.store.inner.releases.entry(self.name.clone()).or_insert(0) += 1;

        if self.fail_close {
            return Err(Error::io(&self.name, "close failed by injected fault"));
        }
        Ok(())
    }
}

impl Drop for MemoryReadHandle {
    fn drop(&mut self) {
        self.release();
    }
}
