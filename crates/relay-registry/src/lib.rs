//! Origin registry client for the relay proxy
//!
//! This crate provides the npm-style metadata types served by the origin
//! registry and an HTTP client for fetching metadata documents and
//! tarballs from it.

pub mod api;
pub mod client;

// Re-export main types
pub use api::{DistInfo, PackageMetadataResponse, VersionMetadata};
pub use client::{ClientOptions, RegistryClient};

use relay_core::error::RelayError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RelayError>;
