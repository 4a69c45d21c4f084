//! Core data types for the relay proxy.
//!
//! This module provides the fundamental types shared by every crate:
//! - Scoped package names and the alias mapping
//! - Semantic version validation
//! - The package manifest found inside tarballs

pub mod manifest;
pub mod name;
pub mod version;

// Re-export all public types
pub use manifest::{ExportTarget, Exports, PackageManifest};
pub use name::{from_alias, to_alias, PackageName, PackageNames, RESERVED_SCOPE, SCOPE_SEPARATOR};
pub use version::validate_version;
