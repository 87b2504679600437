//! Remote object-store backend.
//!
//! Namespace model: one container per `Location::root`, object key =
//! `relative_path`, addressed path-style against the account-scoped
//! endpoint `{protocol}://{account}.{suffix}` so the object URL is the
//! canonical `{endpoint}/{root}/{relative_path}` form.
//!
//! The store only accepts lowercase container names; uppercase roots are
//! rejected here with a validation error instead of being lowercased.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use crate::traits::{
    ensure_valid, ByteStream, FileStore, RetrievedStream, StoreError, StoreResult,
    TransferOutcome, UploadReader, SHARED_URL_TTL,
};
use async_trait::async_trait;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as SdkByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use bytes::Bytes;
use filedepot_core::{BackendKind, ConnectionConfig, Location};
use futures::StreamExt;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

/// Object metadata keys attached at upload and read back on download.
const EXTENSION_META: &str = "Extension";
const CONTENT_TYPE_META: &str = "ContentType";

/// Remote object-store implementation of [`FileStore`].
#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
    endpoint: String,
    auto_create_roots: bool,
}

impl RemoteStore {
    /// Create a new RemoteStore from a parsed connection configuration.
    /// Destination containers are auto-created when missing.
    pub async fn new(config: ConnectionConfig) -> StoreResult<Self> {
        Self::with_options(config, true).await
    }

    /// Create a RemoteStore, opting in or out of auto-creating destination
    /// containers on upload and copy.
    pub async fn with_options(
        config: ConnectionConfig,
        auto_create_roots: bool,
    ) -> StoreResult<Self> {
        let endpoint = config.endpoint();

        let credentials = Credentials::new(
            config.account_name.clone(),
            config.account_key.clone(),
            None,
            None,
            "connection-string",
        );

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        // Path-style addressing keeps the bucket in the path segment, which
        // makes object URLs match the canonical location form.
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .retry_config(retry_config)
            .force_path_style(true)
            .build();

        Ok(RemoteStore {
            client: Client::from_conf(s3_config),
            endpoint,
            auto_create_roots,
        })
    }

    fn validate_root(root: &str) -> StoreResult<()> {
        if root.trim().is_empty() {
            return Err(StoreError::Validation(
                "root namespace must be non-empty".to_string(),
            ));
        }
        if root.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(StoreError::Validation(format!(
                "remote root namespaces accept lowercase names only: {root}"
            )));
        }
        Ok(())
    }

    fn validate(location: &Location) -> StoreResult<()> {
        ensure_valid(location)?;
        Self::validate_root(&location.root)
    }

    /// Public URL for an object: `{endpoint}/{root}/{relative_path}`.
    fn object_url(&self, location: &Location) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            location.root,
            location.relative_path
        )
    }

    /// Resolves a root container, creating it when absent (unless
    /// auto-create was disabled at construction).
    async fn ensure_root(&self, root: &str) -> StoreResult<()> {
        match self.client.head_bucket().bucket(root).send().await {
            Ok(_) => return Ok(()),
            Err(e) => {
                let service_err = e.into_service_error();
                if !service_err.is_not_found() {
                    return Err(StoreError::backend(
                        "resolve_root",
                        root.to_string(),
                        service_err,
                    ));
                }
            }
        }

        if !self.auto_create_roots {
            return Err(StoreError::NotFound(root.to_string()));
        }

        match self.client.create_bucket().bucket(root).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_err = e.into_service_error();
                // Concurrent first use may race the creation.
                if service_err.is_bucket_already_owned_by_you()
                    || service_err.is_bucket_already_exists()
                {
                    Ok(())
                } else {
                    Err(StoreError::backend(
                        "create_root",
                        root.to_string(),
                        service_err,
                    ))
                }
            }
        }
    }

    async fn put_object(
        &self,
        body: SdkByteStream,
        size: Option<u64>,
        destination: &Location,
    ) -> StoreResult<TransferOutcome> {
        Self::validate(destination)?;
        self.ensure_root(&destination.root).await?;

        let start = Instant::now();

        let mut request = self
            .client
            .put_object()
            .bucket(&destination.root)
            .key(&destination.relative_path)
            .body(body);

        if let Some(content_type) = &destination.content_type {
            request = request
                .content_type(content_type)
                .metadata(CONTENT_TYPE_META, content_type);
        }
        if let Some(extension) = &destination.extension {
            request = request.metadata(EXTENSION_META, extension);
        }

        request.send().await.map_err(|e| {
            let service_err = e.into_service_error();
            tracing::error!(
                error = %service_err,
                bucket = %destination.root,
                key = %destination.relative_path,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Remote upload failed"
            );
            StoreError::backend("upload", destination.to_string(), service_err)
        })?;

        tracing::info!(
            bucket = %destination.root,
            key = %destination.relative_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote upload successful"
        );

        Ok(TransferOutcome::ok(self.object_url(destination)))
    }

    async fn get_object(
        &self,
        source: &Location,
        operation: &'static str,
    ) -> StoreResult<GetObjectOutput> {
        Self::validate(source)?;

        self.client
            .get_object()
            .bucket(&source.root)
            .key(&source.relative_path)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    StoreError::NotFound(source.to_string())
                } else {
                    tracing::error!(
                        error = %service_err,
                        bucket = %source.root,
                        key = %source.relative_path,
                        "Remote download failed"
                    );
                    StoreError::backend(operation, source.to_string(), service_err)
                }
            })
    }
}

/// The store lowercases metadata keys on the wire, so read them back
/// case-insensitively.
fn metadata_value(metadata: &HashMap<String, String>, key: &str) -> Option<String> {
    metadata
        .get(key)
        .or_else(|| metadata.get(&key.to_ascii_lowercase()))
        .cloned()
}

#[async_trait]
impl FileStore for RemoteStore {
    async fn upload(&self, data: Vec<u8>, destination: &Location) -> StoreResult<TransferOutcome> {
        let size = data.len() as u64;
        self.put_object(SdkByteStream::from(Bytes::from(data)), Some(size), destination)
            .await
    }

    async fn upload_file(
        &self,
        source_path: &Path,
        destination: &Location,
    ) -> StoreResult<TransferOutcome> {
        Self::validate(destination)?;

        let body = SdkByteStream::from_path(source_path).await.map_err(|e| {
            StoreError::backend("upload_file", destination.to_string(), e)
        })?;

        self.put_object(body, None, destination).await
    }

    async fn upload_stream(
        &self,
        mut reader: UploadReader,
        destination: &Location,
    ) -> StoreResult<TransferOutcome> {
        Self::validate(destination)?;

        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; 8192];

        loop {
            let bytes_read = reader.read(&mut chunk).await.map_err(|e| {
                StoreError::backend("upload_stream", destination.to_string(), e)
            })?;
            if bytes_read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..bytes_read]);
        }

        let size = buffer.len() as u64;
        self.put_object(SdkByteStream::from(Bytes::from(buffer)), Some(size), destination)
            .await
    }

    async fn download_stream(&self, source: &Location) -> StoreResult<ByteStream> {
        let response = self.get_object(source, "download").await?;

        let reader = response.body.into_async_read();
        let location = source.to_string();
        let stream = ReaderStream::new(reader)
            .map(move |result| result.map_err(|e| StoreError::backend("download", location.clone(), e)));

        Ok(Box::pin(stream))
    }

    async fn download_info(&self, source: &Location) -> StoreResult<RetrievedStream> {
        let response = self.get_object(source, "download_info").await?;

        let metadata = response.metadata().cloned();
        let mut content_type = response
            .content_type()
            .map(str::to_string)
            .or_else(|| source.content_type.clone());
        let mut extension = source.extension.clone();

        if let Some(meta) = &metadata {
            if let Some(value) = metadata_value(meta, EXTENSION_META) {
                extension = Some(value);
            }
            if let Some(value) = metadata_value(meta, CONTENT_TYPE_META) {
                content_type = Some(value);
            }
        }

        let reader = response.body.into_async_read();
        let location = source.to_string();
        let stream = ReaderStream::new(reader).map(move |result| {
            result.map_err(|e| StoreError::backend("download_info", location.clone(), e))
        });

        Ok(RetrievedStream {
            stream: Box::pin(stream),
            content_type,
            extension,
            metadata,
        })
    }

    async fn download_text(&self, source: &Location) -> StoreResult<String> {
        let response = self.get_object(source, "download_text").await?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::backend("download_text", source.to_string(), e))?;

        String::from_utf8(data.into_bytes().to_vec())
            .map_err(|e| StoreError::backend("download_text", source.to_string(), e))
    }

    async fn copy(
        &self,
        source: &Location,
        destination: &Location,
        wait_for_completion: bool,
        cancel: CancellationToken,
    ) -> StoreResult<TransferOutcome> {
        Self::validate(source)?;
        Self::validate(destination)?;
        self.ensure_root(&destination.root).await?;

        // A missing source is NotFound on every backend; the service error
        // a blind server-side copy raises would not say which side failed.
        if !self.exists(source).await? {
            return Err(StoreError::NotFound(source.to_string()));
        }

        // URL-encode the copy source per the store's API requirements.
        let copy_source = format!(
            "{}/{}",
            source.root,
            urlencoding::encode(&source.relative_path)
        );

        let client = self.client.clone();
        let bucket = destination.root.clone();
        let key = destination.relative_path.clone();
        let source_repr = source.to_string();
        let destination_repr = destination.to_string();
        let start = Instant::now();

        // The server-side copy runs as its own task: a fire-and-forget
        // caller returns immediately, and a cancelled wait abandons the
        // handle while the copy itself keeps running.
        let handle = tokio::spawn(async move {
            let result = client
                .copy_object()
                .bucket(&bucket)
                .copy_source(&copy_source)
                .key(&key)
                .send()
                .await;

            match &result {
                Ok(_) => tracing::info!(
                    source = %source_repr,
                    destination = %destination_repr,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote copy completed"
                ),
                Err(e) => tracing::error!(
                    error = %e,
                    source = %source_repr,
                    destination = %destination_repr,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote copy failed"
                ),
            }

            result
        });

        if !wait_for_completion {
            return Ok(TransferOutcome::accepted());
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            joined = handle => match joined {
                Ok(Ok(_)) => Ok(TransferOutcome::ok(self.object_url(destination))),
                Ok(Err(e)) => Err(StoreError::backend(
                    "copy",
                    destination.to_string(),
                    e.into_service_error(),
                )),
                Err(e) => Err(StoreError::backend("copy", destination.to_string(), e)),
            },
        }
    }

    async fn exists(&self, location: &Location) -> StoreResult<bool> {
        Self::validate(location)?;

        match self
            .client
            .head_object()
            .bucket(&location.root)
            .key(&location.relative_path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StoreError::backend(
                        "exists",
                        location.to_string(),
                        service_err,
                    ))
                }
            }
        }
    }

    async fn delete(&self, location: &Location) -> StoreResult<bool> {
        Self::validate(location)?;

        let start = Instant::now();

        // Object deletes succeed whether or not the key exists, which gives
        // the idempotent contract for free.
        self.client
            .delete_object()
            .bucket(&location.root)
            .key(&location.relative_path)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                tracing::error!(
                    error = %service_err,
                    bucket = %location.root,
                    key = %location.relative_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote delete failed"
                );
                StoreError::backend("delete", location.to_string(), service_err)
            })?;

        tracing::info!(
            bucket = %location.root,
            key = %location.relative_path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote delete successful"
        );

        Ok(true)
    }

    async fn delete_root(&self, root: &str) -> StoreResult<bool> {
        Self::validate_root(root)?;

        match self.client.head_bucket().bucket(root).send().await {
            Ok(_) => {}
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    return Ok(true);
                }
                return Err(StoreError::backend(
                    "delete_root",
                    root.to_string(),
                    service_err,
                ));
            }
        }

        // The container must be emptied before it can be removed.
        let mut continuation_token: Option<String> = None;
        loop {
            let mut request = self.client.list_objects_v2().bucket(root);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let page = request.send().await.map_err(|e| {
                StoreError::backend("delete_root", root.to_string(), e.into_service_error())
            })?;

            let identifiers = page
                .contents()
                .iter()
                .filter_map(|object| object.key())
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::backend("delete_root", root.to_string(), e))?;

            if !identifiers.is_empty() {
                let delete = Delete::builder()
                    .set_objects(Some(identifiers))
                    .build()
                    .map_err(|e| StoreError::backend("delete_root", root.to_string(), e))?;

                self.client
                    .delete_objects()
                    .bucket(root)
                    .delete(delete)
                    .send()
                    .await
                    .map_err(|e| {
                        StoreError::backend("delete_root", root.to_string(), e.into_service_error())
                    })?;
            }

            if page.is_truncated() == Some(true) {
                continuation_token = page.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        self.client
            .delete_bucket()
            .bucket(root)
            .send()
            .await
            .map_err(|e| {
                StoreError::backend("delete_root", root.to_string(), e.into_service_error())
            })?;

        tracing::info!(bucket = %root, "Remote root namespace deleted");

        Ok(true)
    }

    async fn check_connection(&self, root: &str) -> StoreResult<bool> {
        Self::validate_root(root)?;

        match self.client.head_bucket().bucket(root).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StoreError::backend(
                        "check_connection",
                        root.to_string(),
                        service_err,
                    ))
                }
            }
        }
    }

    async fn shared_url(&self, location: &Location) -> StoreResult<String> {
        Self::validate(location)?;

        // Validity window is fixed at one hour from issuance.
        let presigning_config = PresigningConfig::expires_in(SHARED_URL_TTL)
            .map_err(|e| StoreError::backend("shared_url", location.to_string(), e))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&location.root)
            .key(&location.relative_path)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                StoreError::backend("shared_url", location.to_string(), e.into_service_error())
            })?;

        Ok(presigned_request.uri().to_string())
    }

    async fn resolve_uri(&self, location: &Location) -> StoreResult<String> {
        Self::validate(location)?;
        Ok(self.object_url(location))
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Remote
    }
}
