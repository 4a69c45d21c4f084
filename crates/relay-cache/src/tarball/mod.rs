//! Tarball reading and creation utilities
//!
//! This module provides functionality for working with npm-compatible
//! tarballs: reading the manifest out of an origin tarball and building
//! the re-export shim tarball served in its place.

use bytes::Bytes;
use relay_core::utils::hash;

pub mod create;
pub mod exports;
pub mod extract;
pub mod shim;

// Re-export main functions
pub use create::{create_tarball, ArchiveFile};
pub use exports::{export_stem, import_specifier, plan_shims, ShimEntry};
pub use extract::read_manifest;
pub use shim::{build_shim_tarball, ShimSpec};

/// Root directory of every entry in an npm tarball
pub const PACKAGE_ROOT: &str = "package";

/// A gzipped tarball together with its integrity fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tarball {
    /// Compressed archive bytes
    pub bytes: Bytes,
    /// Uppercase hex SHA-1 of `bytes`
    pub shasum: String,
    /// `sha512-<base64>` of `bytes`
    pub integrity: String,
}

impl Tarball {
    /// Wrap compressed bytes, computing both digests
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            shasum: hash::shasum(&bytes),
            integrity: hash::integrity(&bytes),
            bytes,
        }
    }

    /// Size of the compressed archive
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the archive is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
