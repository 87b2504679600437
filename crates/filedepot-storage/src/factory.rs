#[cfg(feature = "storage-local")]
use crate::LocalStore;
#[cfg(feature = "storage-remote")]
use crate::RemoteStore;
use crate::{FileStore, StoreError, StoreResult};
use filedepot_core::{BackendKind, ConfigError, StoreConfig};
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_store(config: &StoreConfig) -> StoreResult<Arc<dyn FileStore>> {
    match config.backend {
        #[cfg(feature = "storage-remote")]
        BackendKind::Remote => {
            let connection_string = config.connection_string.as_deref().ok_or_else(|| {
                StoreError::Config(ConfigError::Missing(
                    "STORAGE_CONNECTION_STRING not configured".to_string(),
                ))
            })?;
            let connection = filedepot_core::ConnectionConfig::parse(connection_string)?;

            let store = RemoteStore::new(connection).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-remote"))]
        BackendKind::Remote => Err(StoreError::Config(ConfigError::Invalid(
            "Remote storage backend not available (storage-remote feature not enabled)".to_string(),
        ))),

        #[cfg(feature = "storage-local")]
        BackendKind::Local => {
            let base_path = config.local_root.clone().ok_or_else(|| {
                StoreError::Config(ConfigError::Missing(
                    "LOCAL_STORAGE_PATH not configured".to_string(),
                ))
            })?;

            let store = LocalStore::new(base_path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        BackendKind::Local => Err(StoreError::Config(ConfigError::Invalid(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        ))),
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use filedepot_core::Location;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_local_store() {
        let dir = tempdir().unwrap();
        let config = StoreConfig {
            backend: BackendKind::Local,
            connection_string: None,
            local_root: Some(dir.path().to_path_buf()),
        };

        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_kind(), BackendKind::Local);

        store
            .upload(b"factory".to_vec(), &Location::new("t1", "f.txt"))
            .await
            .unwrap();
        assert!(store.exists(&Location::new("t1", "f.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_local_store_requires_path() {
        let config = StoreConfig {
            backend: BackendKind::Local,
            connection_string: None,
            local_root: None,
        };

        let err = create_store(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(ConfigError::Missing(_))));
    }

    #[cfg(feature = "storage-remote")]
    #[tokio::test]
    async fn test_create_remote_store_requires_connection_string() {
        let config = StoreConfig {
            backend: BackendKind::Remote,
            connection_string: None,
            local_root: None,
        };

        let err = create_store(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(ConfigError::Missing(_))));
    }

    #[cfg(feature = "storage-remote")]
    #[tokio::test]
    async fn test_create_remote_store_from_connection_string() {
        let config = StoreConfig {
            backend: BackendKind::Remote,
            connection_string: Some(
                "AccountName=acct;AccountKey=key;EndpointSuffix=objects.test".to_string(),
            ),
            local_root: None,
        };

        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_kind(), BackendKind::Remote);
    }
}
