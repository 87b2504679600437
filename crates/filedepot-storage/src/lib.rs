//! Filedepot Storage Library
//!
//! This crate provides the [`FileStore`] contract and its backend
//! implementations: a remote object store and the local filesystem. Callers
//! build a [`Location`](filedepot_core::Location), obtain a backend through
//! the factory (or directly) and invoke operations; swapping backends
//! requires no caller changes.
//!
//! # Addressing
//!
//! All backends address objects by the canonical string form
//! `{root}{delimiter}{relative_path}`: the remote backend maps `root` to a
//! container and `relative_path` to the object key, the local backend maps
//! the whole form to a path under its base directory. Remote containers
//! accept lowercase names only; uppercase roots are rejected at the backend
//! boundary rather than silently lowercased.
//!
//! Returned download streams are scoped resources: dropping the stream
//! releases the underlying handle, so every exit path is covered.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-remote")]
pub mod remote;
pub mod traits;

// Re-export commonly used types
pub use factory::create_store;
pub use filedepot_core::{BackendKind, ConnectionConfig, Location, StoreConfig};
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
#[cfg(feature = "storage-remote")]
pub use remote::RemoteStore;
pub use traits::{
    ByteStream, FileStore, RetrievedStream, StoreError, StoreResult, TransferOutcome,
    UploadReader, SHARED_URL_TTL,
};
