//! Shim tarball synthesis and caching for relay
//!
//! This crate builds the npm-compatible tarballs the proxy serves in place
//! of origin packages, reads manifests out of origin tarballs, and keeps
//! synthesized tarballs in a TTL-bounded in-memory cache.

pub mod cache;
pub mod tarball;

// Re-export main types
pub use cache::{CacheKey, CacheStats, TarballCache};
pub use tarball::{build_shim_tarball, read_manifest, ShimSpec, Tarball};

use relay_core::error::RelayError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, RelayError>;
