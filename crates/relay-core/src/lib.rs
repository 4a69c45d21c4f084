//! # relay-core
//!
//! Core types and utilities shared across all relay crates.
//!
//! This crate provides:
//! - `PackageName` and the alias name mapping between the origin registry
//!   and the compatibility registry
//! - SemVer validation for version keys
//! - `PackageManifest` for the `package.json` found inside tarballs
//! - `RelayError` enum for unified error handling
//! - SHA-1 / SHA-512 integrity helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (PackageName, PackageManifest, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Hashing helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{RelayError, RelayResult};
pub use types::{
    from_alias, to_alias, validate_version, ExportTarget, Exports, PackageManifest, PackageName,
    PackageNames, RESERVED_SCOPE, SCOPE_SEPARATOR,
};
