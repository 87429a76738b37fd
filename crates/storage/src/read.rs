//! Storage file read stream
//!
//! [`StorageFileRead`] is the facade callers use to read one named object
//! from any driver. It owns the driver, tracks the stream lifecycle and
//! applies the ignore-missing policy; all I/O is delegated to the driver.
//!
//! # Lifecycle
//!
//! ```text
//! Created --open--> Opened --close--> Closed
//! ```
//!
//! A stream is move-only. Returning it from a function or storing it in a
//! caller-owned structure transfers responsibility for releasing its backend
//! resource without any I/O; the old binding is unusable afterwards.
//!
//! # Example
//!
//! ```no_run
//! use storage::{LocalDriver, StorageFileRead};
//!
//! # async fn example() -> storage_core::Result<()> {
//! let mut file = StorageFileRead::new("base/PG_VERSION", false, 64 * 1024, LocalDriver::new("/backup"));
//! if file.open().await?.is_opened() {
//!     while let Some(chunk) = file.read().await? {
//!         println!("read {} bytes", chunk.len());
//!     }
//! }
//! let _ = file.close().await;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use bytes::Bytes;
use storage_core::{CloseOutcome, Error, OpenOutcome, Result, StreamState};
use tracing::{debug, instrument, warn};

use crate::{FileReadDriver, FileReadHandle};

/// Longest name rendered by `Display`/`Debug`, in characters
const MAX_DISPLAY_NAME: usize = 256;

enum ReadState {
    Created,
    /// Open found the object missing and the policy ignored it
    Missing,
    Opened {
        handle: Box<dyn FileReadHandle>,
        eof: bool,
    },
    Closed,
}

impl ReadState {
    fn public(&self) -> StreamState {
        match self {
            ReadState::Created | ReadState::Missing => StreamState::Created,
            ReadState::Opened { .. } => StreamState::Opened,
            ReadState::Closed => StreamState::Closed,
        }
    }
}

/// A read stream over one named storage object
pub struct StorageFileRead {
    name: String,
    ignore_missing: bool,
    buffer_size: usize,
    driver: Box<dyn FileReadDriver>,
    state: ReadState,
}

impl StorageFileRead {
    /// Create a stream in the `Created` state
    ///
    /// # Arguments
    /// * `name` - Object name, interpreted by the driver
    /// * `ignore_missing` - Treat a missing object as empty instead of an error
    /// * `buffer_size` - Upper bound on the size of each chunk returned by `read`
    /// * `driver` - Backend the stream reads through
    pub fn new<D: FileReadDriver>(
        name: impl Into<String>,
        ignore_missing: bool,
        buffer_size: usize,
        driver: D,
    ) -> Self {
        Self::with_driver(name, ignore_missing, buffer_size, Box::new(driver))
    }

    /// Create a stream bound to an already boxed driver
    pub fn with_driver(
        name: impl Into<String>,
        ignore_missing: bool,
        buffer_size: usize,
        driver: Box<dyn FileReadDriver>,
    ) -> Self {
        Self {
            name: name.into(),
            ignore_missing,
            buffer_size,
            driver,
            state: ReadState::Created,
        }
    }

    /// Open the object for reading
    ///
    /// # Returns
    /// * `OpenOutcome::Opened` - the stream holds a backend resource
    /// * `OpenOutcome::SkippedMissing` - the object is missing and ignored;
    ///   the stream stays `Created` and reads return end of stream
    ///
    /// # Errors
    /// Returns `NotFound` (when not ignoring missing objects),
    /// `PermissionDenied` or `Io` from the driver, `InvalidConfig` for a zero
    /// buffer size, and `Protocol` if the stream was already opened or closed.
    #[instrument(skip(self), fields(name = %self.name, driver = self.driver.kind()))]
    pub async fn open(&mut self) -> Result<OpenOutcome> {
        if !matches!(self.state, ReadState::Created | ReadState::Missing) {
            return Err(Error::protocol(
                "open",
                self.state(),
                "a stream can only be opened from the created state",
            ));
        }
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig {
                message: format!("buffer size for {} must be greater than zero", self.name),
            });
        }

        match self.driver.open(&self.name).await {
            Ok(handle) => {
                self.state = ReadState::Opened { handle, eof: false };
                debug!(buffer_size = self.buffer_size, "Stream opened");
                Ok(OpenOutcome::Opened)
            }
            Err(Error::NotFound { .. }) if self.ignore_missing => {
                self.state = ReadState::Missing;
                debug!("Object missing, ignored");
                Ok(OpenOutcome::SkippedMissing)
            }
            Err(e) => Err(e),
        }
    }

    /// Read the next chunk
    ///
    /// Each call asks the driver for at most `buffer_size` bytes and returns
    /// its chunk unchanged. `Ok(None)` marks end of stream and is returned
    /// again on every later call; the stream cannot be rewound.
    ///
    /// # Errors
    /// Returns `Protocol` if the stream was never opened or is closed, and
    /// driver errors as-is.
    #[instrument(level = "trace", skip(self), fields(name = %self.name))]
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        let state = self.state.public();
        let buffer_size = self.buffer_size;

        match &mut self.state {
            ReadState::Missing | ReadState::Opened { eof: true, .. } => Ok(None),
            ReadState::Created => Err(Error::protocol(
                "read",
                state,
                "stream has not been opened",
            )),
            ReadState::Closed => Err(Error::protocol("read", state, "stream is closed")),
            ReadState::Opened { handle, eof } => match handle.read_chunk(buffer_size).await? {
                Some(chunk) if chunk.len() > buffer_size => Err(Error::protocol(
                    "read",
                    state,
                    format!(
                        "driver returned {} bytes, more than the {} requested",
                        chunk.len(),
                        buffer_size
                    ),
                )),
                Some(chunk) if !chunk.is_empty() => Ok(Some(chunk)),
                _ => {
                    *eof = true;
                    debug!("End of stream");
                    Ok(None)
                }
            },
        }
    }

    /// Close the stream, releasing the backend resource
    ///
    /// Safe in every state. The stream is `Closed` afterwards if it was
    /// opened, even when the driver reports a release error; that error is
    /// returned as [`CloseOutcome::ReleaseFailed`].
    #[instrument(skip(self), fields(name = %self.name, driver = self.driver.kind()))]
    pub async fn close(&mut self) -> CloseOutcome {
        match std::mem::replace(&mut self.state, ReadState::Closed) {
            ReadState::Opened { mut handle, .. } => {
                let result = handle.close().await;
                drop(handle);
                match result {
                    Ok(()) => {
                        debug!("Stream closed");
                        CloseOutcome::Released
                    }
                    Err(e) => {
                        warn!(error = %e, "Driver failed to release stream resource");
                        CloseOutcome::ReleaseFailed(e)
                    }
                }
            }
            ReadState::Closed => CloseOutcome::AlreadyClosed,
            never_opened => {
                self.state = never_opened;
                CloseOutcome::NotOpened
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.state.public()
    }

    /// The bound driver
    pub fn driver(&self) -> &dyn FileReadDriver {
        self.driver.as_ref()
    }

    /// The bound driver as its concrete type, if it is a `D`
    pub fn driver_as<D: FileReadDriver>(&self) -> Option<&D> {
        self.driver.as_any().downcast_ref::<D>()
    }

    /// Whether a missing object opens as an empty stream
    pub fn ignore_missing(&self) -> bool {
        self.ignore_missing
    }

    /// Get the object name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the requested chunk size
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn display_name(&self) -> &str {
        match self.name.char_indices().nth(MAX_DISPLAY_NAME) {
            Some((end, _)) => &self.name[..end],
            None => &self.name,
        }
    }
}

impl Drop for StorageFileRead {
    fn drop(&mut self) {
        if let ReadState::Opened { .. } = self.state {
            // Dropping the handle releases the resource
            warn!(name = %self.display_name(), "Releasing stream dropped while open");
            self.state = ReadState::Closed;
        }
    }
}

impl fmt::Display for StorageFileRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{name: {:?}{}, ignore_missing: {}, buffer_size: {}, state: {}, driver: {}}}",
            self.display_name(),
            if self.display_name().len() < self.name.len() { "..." } else { "" },
            self.ignore_missing,
            self.buffer_size,
            self.state(),
            self.driver.kind()
        )
    }
}

impl fmt::Debug for StorageFileRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageFileRead")
            .field("name", &self.display_name())
            .field("ignore_missing", &self.ignore_missing)
            .field("buffer_size", &self.buffer_size)
            .field("state", &self.state())
            .field("driver", &self.driver.kind())
            .finish()
    }
}
