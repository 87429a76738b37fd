//! Error types for storage read streams

use std::fmt;
use std::io;

use thiserror::Error;

use crate::StreamState;

/// Result type alias using the storage Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for storage read streams
#[derive(Error, Debug)]
pub enum Error {
    // Open errors
    #[error("Storage object not found: {name}")]
    NotFound { name: String },

    #[error("Permission denied for {name}: {message}")]
    PermissionDenied { name: String, message: String },

    // Backend errors
    #[error("I/O error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Storage backend not available: {backend}")]
    StorageUnavailable { backend: String },

    // Contract errors
    #[error("Invalid {operation} on stream in state {state}: {message}")]
    Protocol {
        operation: &'static str,
        state: StreamState,
        message: String,
    },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    Io,
    Protocol,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::Io => "io",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Config => "config",
        };
        f.write_str(kind)
    }
}

impl Error {
    /// Classify a `std::io::Error` raised while accessing `name`
    ///
    /// `NotFound` and `PermissionDenied` map to their own variants, every
    /// other kind becomes [`Error::Io`].
    pub fn from_io(name: impl Into<String>, source: io::Error) -> Self {
        let name = name.into();
        match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound { name },
            io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                name,
                message: source.to_string(),
            },
            _ => Error::Io { name, source },
        }
    }

    /// Shorthand for an [`Error::Io`] built from a message
    pub fn io(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Io {
            name: name.into(),
            source: io::Error::other(message.into()),
        }
    }

    /// Shorthand for an [`Error::Protocol`]
    pub fn protocol(
        operation: &'static str,
        state: StreamState,
        message: impl Into<String>,
    ) -> Self {
        Error::Protocol {
            operation,
            state,
            message: message.into(),
        }
    }

    /// Returns the coarse kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Error::Io { .. } => ErrorKind::Io,
            Error::Protocol { .. } => ErrorKind::Protocol,
            Error::InvalidConfig { .. }
            | Error::Serialization(_)
            | Error::StorageUnavailable { .. } => ErrorKind::Config,
        }
    }

    /// Returns true if this error is retryable
    ///
    /// Retrying is left to the caller or a wrapping driver.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io { .. })
    }

    /// Returns true if the caller broke the stream state machine
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }

    /// Returns true if the object did not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
