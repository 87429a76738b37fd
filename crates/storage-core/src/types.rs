//! Core type definitions shared by read streams and drivers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Default requested chunk size for reads (64 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Lifecycle state of a read stream
///
/// Transitions only move forward: `Created -> Opened -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    /// Constructed, no backend resource acquired
    Created,

    /// Backend resource held, reads allowed
    Opened,

    /// Backend resource released (terminal)
    Closed,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            StreamState::Created => "created",
            StreamState::Opened => "opened",
            StreamState::Closed => "closed",
        };
        f.write_str(state)
    }
}

/// Successful result of opening a read stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The object exists and the stream is ready for reads
    Opened,

    /// The object is missing and the stream ignores missing objects
    SkippedMissing,
}

impl OpenOutcome {
    /// Returns true if a backend resource was acquired
    pub fn is_opened(self) -> bool {
        self == OpenOutcome::Opened
    }
}

/// Result of closing a read stream
///
/// Closing never fails: a driver release error is reported as
/// [`CloseOutcome::ReleaseFailed`] after the stream has already moved to
/// `Closed`.
#[derive(Debug)]
#[must_use]
pub enum CloseOutcome {
    /// The backend resource was released
    Released,

    /// The stream was never opened, nothing to release
    NotOpened,

    /// The stream was closed by an earlier call
    AlreadyClosed,

    /// The driver reported an error while releasing its resource
    ReleaseFailed(Error),
}

impl CloseOutcome {
    /// Returns true unless the driver reported a release error
    pub fn is_clean(&self) -> bool {
        !matches!(self, CloseOutcome::ReleaseFailed(_))
    }

    /// Returns the release error, if any
    pub fn warning(&self) -> Option<&Error> {
        match self {
            CloseOutcome::ReleaseFailed(e) => Some(e),
            _ => None,
        }
    }
}
