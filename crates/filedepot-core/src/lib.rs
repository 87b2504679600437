//! Filedepot Core Library
//!
//! This crate provides the value model shared by all filedepot components:
//! the mime-type registry, the backend-agnostic [`Location`] descriptor,
//! backend selection types and connection configuration.
//!
//! # Canonical path form
//!
//! Every stored object is addressed by a [`Location`]: a root namespace
//! (bucket, container or directory), a relative path and a delimiter. The
//! canonical string form is `{root}{delimiter}{relative_path}` and all
//! backends use it consistently so they stay interchangeable.

pub mod backend;
pub mod config;
pub mod location;
pub mod mime;

// Re-export commonly used types
pub use backend::BackendKind;
pub use config::{ConfigError, ConnectionConfig, StoreConfig};
pub use location::{Location, PathBuilder};
pub use mime::MimeEntry;
