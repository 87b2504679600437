//! Storage abstraction trait
//!
//! This module defines the [`FileStore`] trait that all storage backends
//! must implement, together with the error taxonomy and the transfer result
//! types shared by every backend.

use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use filedepot_core::{BackendKind, ConfigError, Location};
use futures::Stream;
use http::StatusCode;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Storage operation errors.
///
/// Callers can distinguish "object absent" (`NotFound`, expected and often
/// non-fatal) from "operation failed" (`Backend`, an infrastructure fault
/// with the original cause chained). Configuration and validation failures
/// are raised before any I/O is attempted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid location: {0}")]
    Validation(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("{operation} failed for {location}")]
    Backend {
        operation: &'static str,
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Copy was cancelled before completion")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Wraps a transport/filesystem fault with the failing operation and
    /// location, keeping the original cause in the error chain.
    pub fn backend(
        operation: &'static str,
        location: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        StoreError::Backend {
            operation,
            location: location.into(),
            source: source.into(),
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Chunked file content, released when dropped.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StoreError>> + Send>>;

/// Readable source for a streamed upload.
pub type UploadReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Outcome of an upload or copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub status: StatusCode,
    /// Backend-native URI of the stored object, when the operation
    /// produced one.
    pub uri: Option<String>,
}

impl TransferOutcome {
    pub fn ok(uri: impl Into<String>) -> Self {
        TransferOutcome {
            status: StatusCode::OK,
            uri: Some(uri.into()),
        }
    }

    /// Operation accepted; completion not yet guaranteed (fire-and-forget
    /// copy).
    pub fn accepted() -> Self {
        TransferOutcome {
            status: StatusCode::OK,
            uri: None,
        }
    }
}

/// Result of a download-with-metadata operation.
///
/// Owns the opened byte stream; dropping it releases the underlying I/O
/// handle. `extension` and `content_type` are recovered from stored object
/// metadata when present, otherwise they fall back to the request
/// location's own fields.
pub struct RetrievedStream {
    pub stream: ByteStream,
    pub content_type: Option<String>,
    pub extension: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

impl std::fmt::Debug for RetrievedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievedStream")
            .field("content_type", &self.content_type)
            .field("extension", &self.extension)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Storage abstraction trait
///
/// One conforming type per physical backend (remote object store, local
/// filesystem), chosen by the caller at construction time and dispatched as
/// `Arc<dyn FileStore>`. Operations against distinct locations may run
/// concurrently without coordination; no two operations share mutable state
/// keyed by the same location.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Uploads an in-memory buffer, creating or overwriting the object at
    /// `destination`. On success the returned URI identifies the stored
    /// object.
    async fn upload(&self, data: Vec<u8>, destination: &Location) -> StoreResult<TransferOutcome>;

    /// Uploads a file read from the local filesystem.
    async fn upload_file(
        &self,
        source_path: &Path,
        destination: &Location,
    ) -> StoreResult<TransferOutcome>;

    /// Uploads from an open readable stream, consumed until EOF.
    async fn upload_stream(
        &self,
        reader: UploadReader,
        destination: &Location,
    ) -> StoreResult<TransferOutcome>;

    /// Downloads the full object as a chunked stream.
    async fn download_stream(&self, source: &Location) -> StoreResult<ByteStream>;

    /// Downloads the object along with its stored mime metadata. Backends
    /// without object metadata echo the request location's fields back.
    async fn download_info(&self, source: &Location) -> StoreResult<RetrievedStream>;

    /// Downloads the object, fully drains it as UTF-8 text and releases the
    /// underlying stream.
    async fn download_text(&self, source: &Location) -> StoreResult<String>;

    /// Copies `source` to `destination` without disturbing the source. A
    /// missing source yields [`StoreError::NotFound`] on every backend.
    ///
    /// With `wait_for_completion == false` the call returns as soon as the
    /// backend copy is in flight, with no guarantee the destination is yet
    /// readable. With `wait_for_completion == true` the call blocks until
    /// the backend reports a terminal state, racing `cancel`; cancellation
    /// aborts the wait (returning [`StoreError::Cancelled`]) without
    /// affecting the in-flight backend-side copy.
    async fn copy(
        &self,
        source: &Location,
        destination: &Location,
        wait_for_completion: bool,
        cancel: CancellationToken,
    ) -> StoreResult<TransferOutcome>;

    /// Object-level existence check. Absence is `Ok(false)`, never an
    /// error; only namespace-resolution or configuration failures error.
    async fn exists(&self, location: &Location) -> StoreResult<bool>;

    /// Deletes an object. Idempotent: returns `Ok(true)` whether or not the
    /// object existed.
    async fn delete(&self, location: &Location) -> StoreResult<bool>;

    /// Deletes a whole root namespace (bucket, container or directory) and
    /// everything in it. Idempotent in the same sense as [`delete`].
    ///
    /// [`delete`]: FileStore::delete
    async fn delete_root(&self, root: &str) -> StoreResult<bool>;

    /// Lightweight reachability probe: an existence check against `root`
    /// itself.
    async fn check_connection(&self, root: &str) -> StoreResult<bool>;

    /// Produces a read-only access URL valid for exactly one hour from
    /// issuance. Backends without native signed URLs degrade to the
    /// canonical path string with no access control; callers must not treat
    /// that as a secure share.
    async fn shared_url(&self, location: &Location) -> StoreResult<String>;

    /// Backend-native URI for `location`, without any guarantee the object
    /// exists.
    async fn resolve_uri(&self, location: &Location) -> StoreResult<String>;

    /// Get the storage backend kind
    fn backend_kind(&self) -> BackendKind;
}

/// Validity window of shared URLs. Fixed by contract, not configurable.
pub const SHARED_URL_TTL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

pub(crate) fn ensure_valid(location: &Location) -> StoreResult<()> {
    if !location.is_valid() {
        return Err(StoreError::Validation(format!(
            "location requires a non-empty root and relative path, got \"{location}\""
        )));
    }
    Ok(())
}
