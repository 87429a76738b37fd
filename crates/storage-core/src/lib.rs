//! Storage Core - Foundation for storage read streams
//!
//! Provides the error taxonomy, lifecycle types, configuration and
//! tracing setup shared by the storage drivers and the read stream facade.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{BackendConfig, Compression, StorageConfig};
pub use error::{Error, ErrorKind, Result};
pub use types::*;
