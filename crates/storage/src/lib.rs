//! Storage - Backend-agnostic read streams
//!
//! Provides [`StorageFileRead`], a read stream over a named object, and the
//! drivers it can be bound to:
//! - Local filesystem
//! - In-memory store (tests and tooling)
//! - Amazon S3 / S3-compatible storage (with `s3` feature)
//! - Gzip decompression layered on any other driver
//!
//! # Example
//!
//! ```no_run
//! use storage::Storage;
//!
//! # async fn example() -> storage_core::Result<()> {
//! let storage = Storage::local("/var/lib/backup");
//! if let Some(mut file) = storage.open_read("backup.info").await? {
//!     while let Some(chunk) = file.read().await? {
//!         println!("{} bytes", chunk.len());
//!     }
//!     let _ = file.close().await;
//! }
//! # Ok(())
//! # }
//! ```

mod driver;
mod gzip;
mod local;
pub mod memory;
mod read;
mod storage;

#[cfg(feature = "s3")]
mod s3;

pub use driver::{FileReadDriver, FileReadHandle};
pub use gzip::GzipDriver;
pub use local::LocalDriver;
pub use memory::{Fault, MemoryDriver, MemoryStore};
pub use read::StorageFileRead;
pub use storage::Storage;

#[cfg(feature = "s3")]
pub use s3::{S3Config, S3Driver};
