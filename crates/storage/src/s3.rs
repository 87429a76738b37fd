//! S3 read driver
//!
//! Streams objects from Amazon S3 or an S3-compatible service (MinIO,
//! LocalStack, ...). The response body is pulled lazily, one network
//! chunk at a time; no retries are attempted here.

use std::any::Any;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::Builder as S3ConfigBuilder,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::get_object::GetObjectError,
    primitives::ByteStream,
    Client,
};
use bytes::Bytes;
use storage_core::{Error, Result};
use tracing::{debug, instrument};

use crate::{FileReadDriver, FileReadHandle};

/// S3-compatible read driver
#[derive(Debug, Clone)]
pub struct S3Driver {
    client: Client,
    bucket: String,
    prefix: String,
}

/// Configuration for S3Driver
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// Optional prefix for all object names (e.g., "cluster-1/")
    pub prefix: Option<String>,
    /// Optional custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: Option<String>,
    /// Force path-style addressing (required for MinIO)
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: None,
            endpoint_url: None,
            region: Some("us-east-1".to_string()),
            force_path_style: false,
        }
    }
}

impl S3Driver {
    /// Create a new S3Driver with default AWS configuration
    ///
    /// Uses environment variables or instance profile for credentials.
    pub async fn new(bucket: impl Into<String>) -> Self {
        Self::with_config(S3Config {
            bucket: bucket.into(),
            ..Default::default()
        })
        .await
    }

    /// Create a new S3Driver with custom configuration
    pub async fn with_config(config: S3Config) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(
                config.region.unwrap_or_else(|| "us-east-1".to_string()),
            ))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        Self {
            client: Client::from_conf(s3_config_builder.build()),
            bucket: config.bucket,
            prefix: config.prefix.unwrap_or_default(),
        }
    }

    /// Create S3Driver for MinIO (convenience constructor)
    pub async fn minio(endpoint: &str, bucket: &str) -> Self {
        Self::with_config(S3Config {
            bucket: bucket.to_string(),
            endpoint_url: Some(endpoint.to_string()),
            force_path_style: true,
            ..Default::default()
        })
        .await
    }

    /// The bucket objects are read from
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the full S3 key for an object name
    fn s3_key(&self, name: &str) -> String {
        object_key(&self.prefix, name)
    }
}

fn object_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), name)
    }
}

/// Map a `get_object` failure onto the storage error taxonomy
fn classify_error(name: &str, err: SdkError<GetObjectError>) -> Error {
    if matches!(err.as_service_error(), Some(e) if e.is_no_such_key()) {
        return Error::NotFound {
            name: name.to_string(),
        };
    }

    match err.code() {
        Some("NoSuchKey") | Some("NotFound") => Error::NotFound {
            name: name.to_string(),
        },
        Some("AccessDenied") | Some("Forbidden") => Error::PermissionDenied {
            name: name.to_string(),
            message: err.message().unwrap_or("access denied").to_string(),
        },
        _ => Error::io(
            name,
            format!("S3 get_object failed: {}", DisplayErrorContext(&err)),
        ),
    }
}

#[async_trait]
impl FileReadDriver for S3Driver {
    fn kind(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn open(&mut self, name: &str) -> Result<Box<dyn FileReadHandle>> {
        let key = self.s3_key(name);
        debug!(%key, "Opening S3 object");

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| classify_error(name, e))?;

        Ok(Box::new(S3ReadHandle {
            name: name.to_string(),
            body: Some(output.body),
            pending: Bytes::new(),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Streaming response body for one object
struct S3ReadHandle {
    name: String,
    body: Option<ByteStream>,
    /// Part of the last network chunk not yet returned
    pending: Bytes,
}

#[async_trait]
impl FileReadHandle for S3ReadHandle {
    async fn read_chunk(&mut self, max_size: usize) -> Result<Option<Bytes>> {
        loop {
            if !self.pending.is_empty() {
                let size = max_size.min(self.pending.len());
                return Ok(Some(self.pending.split_to(size)));
            }

            let Some(body) = self.body.as_mut() else {
                return Ok(None);
            };

            match body.next().await {
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(e)) => {
                    return Err(Error::io(
                        &self.name,
                        format!("Failed to read S3 response body: {}", e),
                    ))
                }
                None => {
                    self.body = None;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the body returns or discards the connection
        self.body = None;
        self.pending = Bytes::new();
        Ok(())
    }
}
