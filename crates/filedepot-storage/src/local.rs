//! Local filesystem backend.
//!
//! Maps a [`Location`] to `{base}/{root}/{relative_path}` (the relative
//! path split on the location's delimiter), mirroring the canonical string
//! form the remote backend uses so the two stay interchangeable. There is
//! no connection state: the backend is always "connected", shared URLs
//! degrade to the canonical path string with no access control, and object
//! metadata is simulated by echoing the request location's fields back.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::traits::{
    ensure_valid, ByteStream, FileStore, RetrievedStream, StoreError, StoreResult,
    TransferOutcome, UploadReader,
};
use async_trait::async_trait;
use filedepot_core::{BackendKind, ConfigError, Location};
use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Local filesystem implementation of [`FileStore`].
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at `base_path`; the directory is
    /// created if it does not exist.
    pub async fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StoreError::Config(ConfigError::Invalid(format!(
                "failed to create storage directory {}: {}",
                base_path.display(),
                e
            )))
        })?;

        Ok(LocalStore { base_path })
    }

    /// Resolves a location to a filesystem path under the base directory.
    /// Traversal sequences that could escape the base are rejected.
    fn resolve(&self, location: &Location) -> StoreResult<PathBuf> {
        ensure_valid(location)?;
        reject_traversal(&location.root)?;
        reject_traversal(&location.relative_path)?;

        let mut path = self.base_path.join(&location.root);
        for segment in location
            .relative_path
            .split(location.delimiter())
            .filter(|s| !s.is_empty())
        {
            path.push(segment);
        }

        Ok(path)
    }

    fn resolve_root(&self, root: &str) -> StoreResult<PathBuf> {
        if root.trim().is_empty() {
            return Err(StoreError::Validation(
                "root namespace must be non-empty".to_string(),
            ));
        }
        reject_traversal(root)?;
        Ok(self.base_path.join(root))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_all(
        &self,
        data: &[u8],
        path: &Path,
        destination: &Location,
    ) -> StoreResult<()> {
        self.ensure_parent_dir(path).await?;

        let mut file = fs::File::create(path).await.map_err(|e| {
            StoreError::backend("upload", destination.to_string(), e)
        })?;

        file.write_all(data).await.map_err(|e| {
            StoreError::backend("upload", destination.to_string(), e)
        })?;

        file.sync_all().await.map_err(|e| {
            StoreError::backend("upload", destination.to_string(), e)
        })?;

        Ok(())
    }
}

/// Existence probe that keeps the error branch: an undeterminable check
/// (a permission fault on a parent directory, say) is a backend fault,
/// not absence.
async fn probe_exists(
    path: &Path,
    operation: &'static str,
    location: &str,
) -> StoreResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| StoreError::backend(operation, location.to_string(), e))
}

fn reject_traversal(value: &str) -> StoreResult<()> {
    if value.contains("..") || value.starts_with('/') {
        return Err(StoreError::Validation(format!(
            "path escapes the storage directory: {value}"
        )));
    }
    Ok(())
}

/// `file://{absolute-path}` form for a local path. The object does not
/// have to exist.
fn file_uri(path: &Path) -> StoreResult<String> {
    let absolute = std::path::absolute(path)?;
    Ok(format!("file://{}", absolute.display()))
}

#[async_trait]
impl FileStore for LocalStore {
    async fn upload(&self, data: Vec<u8>, destination: &Location) -> StoreResult<TransferOutcome> {
        let path = self.resolve(destination)?;
        let size = data.len();
        let start = Instant::now();

        self.write_all(&data, &path, destination).await?;

        tracing::info!(
            path = %path.display(),
            location = %destination,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
        );

        Ok(TransferOutcome::ok(file_uri(&path)?))
    }

    async fn upload_file(
        &self,
        source_path: &Path,
        destination: &Location,
    ) -> StoreResult<TransferOutcome> {
        let path = self.resolve(destination)?;
        self.ensure_parent_dir(&path).await?;

        let start = Instant::now();

        // A direct byte copy; interrupted mid-copy this leaves a partial
        // file, so the atomicity guarantee here is best-effort only.
        let bytes_copied = fs::copy(source_path, &path).await.map_err(|e| {
            StoreError::backend("upload_file", destination.to_string(), e)
        })?;

        tracing::info!(
            path = %path.display(),
            location = %destination,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local file upload successful"
        );

        Ok(TransferOutcome::ok(file_uri(&path)?))
    }

    async fn upload_stream(
        &self,
        mut reader: UploadReader,
        destination: &Location,
    ) -> StoreResult<TransferOutcome> {
        let path = self.resolve(destination)?;
        self.ensure_parent_dir(&path).await?;

        let start = Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StoreError::backend("upload_stream", destination.to_string(), e)
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StoreError::backend("upload_stream", destination.to_string(), e)
        })?;

        file.sync_all().await.map_err(|e| {
            StoreError::backend("upload_stream", destination.to_string(), e)
        })?;

        tracing::info!(
            path = %path.display(),
            location = %destination,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local stream upload successful"
        );

        Ok(TransferOutcome::ok(file_uri(&path)?))
    }

    async fn download_stream(&self, source: &Location) -> StoreResult<ByteStream> {
        let path = self.resolve(source)?;

        if !probe_exists(&path, "download", &source.to_string()).await? {
            return Err(StoreError::NotFound(source.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StoreError::backend("download", source.to_string(), e)
        })?;

        let location = source.to_string();
        let stream = tokio_util::io::ReaderStream::new(file)
            .map(move |result| result.map_err(|e| StoreError::backend("download", location.clone(), e)));

        Ok(Box::pin(stream))
    }

    async fn download_info(&self, source: &Location) -> StoreResult<RetrievedStream> {
        let stream = self.download_stream(source).await?;

        // No stored metadata on a plain filesystem: echo the request
        // location's mime fields back.
        Ok(RetrievedStream {
            stream,
            content_type: source.content_type.clone(),
            extension: source.extension.clone(),
            metadata: None,
        })
    }

    async fn download_text(&self, source: &Location) -> StoreResult<String> {
        let path = self.resolve(source)?;

        if !probe_exists(&path, "download_text", &source.to_string()).await? {
            return Err(StoreError::NotFound(source.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StoreError::backend("download_text", source.to_string(), e)
        })?;

        String::from_utf8(data)
            .map_err(|e| StoreError::backend("download_text", source.to_string(), e))
    }

    async fn copy(
        &self,
        source: &Location,
        destination: &Location,
        _wait_for_completion: bool,
        cancel: CancellationToken,
    ) -> StoreResult<TransferOutcome> {
        let from_path = self.resolve(source)?;
        let to_path = self.resolve(destination)?;

        // The byte copy completes synchronously inside this call, so the
        // copy is already finished by the time the wait flag would be
        // consulted; cancellation is only observable before I/O starts.
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        if !probe_exists(&from_path, "copy", &source.to_string()).await? {
            return Err(StoreError::NotFound(source.to_string()));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            StoreError::backend("copy", destination.to_string(), e)
        })?;

        tracing::info!(
            source = %source,
            destination = %destination,
            from_path = %from_path.display(),
            to_path = %to_path.display(),
            "Local copy successful"
        );

        Ok(TransferOutcome::ok(file_uri(&to_path)?))
    }

    async fn exists(&self, location: &Location) -> StoreResult<bool> {
        let path = self.resolve(location)?;
        probe_exists(&path, "exists", &location.to_string()).await
    }

    async fn delete(&self, location: &Location) -> StoreResult<bool> {
        let path = self.resolve(location)?;

        if !probe_exists(&path, "delete", &location.to_string()).await? {
            // Absence of the target is success, not an error.
            return Ok(true);
        }

        fs::remove_file(&path).await.map_err(|e| {
            StoreError::backend("delete", location.to_string(), e)
        })?;

        tracing::info!(
            path = %path.display(),
            location = %location,
            "Local delete successful"
        );

        Ok(true)
    }

    async fn delete_root(&self, root: &str) -> StoreResult<bool> {
        let path = self.resolve_root(root)?;

        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Local root namespace deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(StoreError::backend("delete_root", root.to_string(), e)),
        }
    }

    async fn check_connection(&self, root: &str) -> StoreResult<bool> {
        self.resolve_root(root)?;
        // The filesystem carries no connection state.
        Ok(true)
    }

    async fn shared_url(&self, location: &Location) -> StoreResult<String> {
        ensure_valid(location)?;
        // No signed-URL support: the canonical path string, with no expiry
        // and no access control. Not a secure share.
        Ok(location.to_string())
    }

    async fn resolve_uri(&self, location: &Location) -> StoreResult<String> {
        let path = self.resolve(location)?;
        file_uri(&path)
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use std::pin::Pin;

    use tempfile::tempdir;

    async fn drain(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    fn text_location(root: &str, relative_path: &str) -> Location {
        let mut location = Location::new(root, relative_path);
        location.extension = Some(".txt".to_string());
        location.content_type = Some("text/plain".to_string());
        location
    }

    #[tokio::test]
    async fn test_upload_download_round_trip() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let destination = Location::new("docs", "sub/test.bin");
        let data = vec![0u8, 1, 2, 254, 255];

        let outcome = store.upload(data.clone(), &destination).await.unwrap();
        assert_eq!(outcome.status, http::StatusCode::OK);
        assert!(outcome.uri.unwrap().starts_with("file://"));

        let downloaded = drain(store.download_stream(&destination).await.unwrap()).await;
        assert_eq!(data, downloaded);
    }

    #[tokio::test]
    async fn test_exists_lifecycle() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();
        let location = text_location("t1", "f.txt");

        assert!(!store.exists(&location).await.unwrap());
        store.upload(b"data".to_vec(), &location).await.unwrap();
        assert!(store.exists(&location).await.unwrap());
        assert!(store.delete(&location).await.unwrap());
        assert!(!store.exists(&location).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();
        let location = Location::new("t1", "missing.txt");

        assert!(store.delete(&location).await.unwrap());
        assert!(store.delete(&location).await.unwrap());
    }

    #[tokio::test]
    async fn test_full_scenario() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let original = text_location("t1", "f.txt");
        let copy = text_location("t1", "f2.txt");

        store.upload(b"hello".to_vec(), &original).await.unwrap();
        assert!(store.exists(&original).await.unwrap());
        assert_eq!(store.download_text(&original).await.unwrap(), "hello");

        store
            .copy(&original, &copy, true, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(store.download_text(&copy).await.unwrap(), "hello");

        // Copy is non-destructive.
        assert!(store.exists(&original).await.unwrap());

        assert!(store.delete(&copy).await.unwrap());
        assert!(!store.exists(&copy).await.unwrap());
        assert!(store.exists(&original).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let err = store
            .copy(
                &Location::new("t1", "missing.txt"),
                &Location::new("t1", "copy.txt"),
                true,
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_copy_observes_cancellation() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let source = Location::new("t1", "f.txt");
        store.upload(b"data".to_vec(), &source).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store
            .copy(&source, &Location::new("t1", "f2.txt"), true, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
        assert!(!store.exists(&Location::new("t1", "f2.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_probe_faults_surface_as_backend_errors() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        store
            .upload(b"data".to_vec(), &Location::new("t1", "f.txt"))
            .await
            .unwrap();

        // Routing through a regular file makes the existence probe fail
        // with ENOTDIR: undeterminable, not absent.
        let through_file = Location::new("t1", "f.txt/nested");
        assert!(matches!(
            store.exists(&through_file).await.unwrap_err(),
            StoreError::Backend { operation: "exists", .. }
        ));
        assert!(matches!(
            store.delete(&through_file).await.unwrap_err(),
            StoreError::Backend { operation: "delete", .. }
        ));
        assert!(matches!(
            store.download_text(&through_file).await.unwrap_err(),
            StoreError::Backend { operation: "download_text", .. }
        ));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let escape = Location::new("t1", "../../etc/passwd");
        assert!(matches!(
            store.download_stream(&escape).await.err().unwrap(),
            StoreError::Validation(_)
        ));

        let rooted = Location::new("t1", "/etc/passwd");
        assert!(matches!(
            store.exists(&rooted).await.unwrap_err(),
            StoreError::Validation(_)
        ));

        let bad_root = Location::new("..", "f.txt");
        assert!(matches!(
            store.delete(&bad_root).await.unwrap_err(),
            StoreError::Validation(_)
        ));

        assert!(matches!(
            store.delete_root("../other").await.unwrap_err(),
            StoreError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_location_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let err = store
            .upload(b"x".to_vec(), &Location::new("", "f.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store
            .download_text(&Location::new("t1", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_upload_file_round_trip() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let source_file = dir.path().join("source.txt");
        tokio::fs::write(&source_file, b"from a file").await.unwrap();

        let destination = text_location("t1", "uploaded.txt");
        store.upload_file(&source_file, &destination).await.unwrap();

        assert_eq!(
            store.download_text(&destination).await.unwrap(),
            "from a file"
        );
    }

    #[tokio::test]
    async fn test_upload_stream_round_trip() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let data = b"stream test data".to_vec();
        let reader = Box::pin(std::io::Cursor::new(data.clone()))
            as Pin<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;

        let destination = Location::new("t1", "stream.txt");
        store.upload_stream(reader, &destination).await.unwrap();

        let downloaded = drain(store.download_stream(&destination).await.unwrap()).await;
        assert_eq!(data, downloaded);
    }

    #[tokio::test]
    async fn test_download_info_echoes_request_fields() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let location = text_location("t1", "f.txt");
        store.upload(b"hello".to_vec(), &location).await.unwrap();

        let info = store.download_info(&location).await.unwrap();
        assert_eq!(info.content_type.as_deref(), Some("text/plain"));
        assert_eq!(info.extension.as_deref(), Some(".txt"));
        assert!(info.metadata.is_none());

        assert_eq!(drain(info.stream).await, b"hello");
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let missing = Location::new("t1", "missing.txt");
        assert!(matches!(
            store.download_stream(&missing).await.err().unwrap(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            store.download_text(&missing).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_root_removes_contents_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        store
            .upload(b"a".to_vec(), &Location::new("t1", "a.txt"))
            .await
            .unwrap();
        store
            .upload(b"b".to_vec(), &Location::new("t1", "sub/b.txt"))
            .await
            .unwrap();

        assert!(store.delete_root("t1").await.unwrap());
        assert!(!store.exists(&Location::new("t1", "a.txt")).await.unwrap());

        // A second delete of an absent root still succeeds.
        assert!(store.delete_root("t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_connection_always_true() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        assert!(store.check_connection("t1").await.unwrap());
        assert!(store.check_connection("never-created").await.unwrap());
    }

    #[tokio::test]
    async fn test_shared_url_degrades_to_canonical_path() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let location = Location::new("t1", "f.txt");
        assert_eq!(store.shared_url(&location).await.unwrap(), "t1/f.txt");
    }

    #[tokio::test]
    async fn test_resolve_uri_is_file_scheme() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let uri = store
            .resolve_uri(&Location::new("t1", "f.txt"))
            .await
            .unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("t1/f.txt"));
    }

    #[tokio::test]
    async fn test_custom_delimiter_maps_to_directories() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let location = Location::with_delimiter("t1", "a:b:c.txt", ":");
        store.upload(b"nested".to_vec(), &location).await.unwrap();

        // The delimiter-separated segments become directories.
        let on_disk = dir.path().join("t1").join("a").join("b").join("c.txt");
        assert!(on_disk.exists());
    }
}
