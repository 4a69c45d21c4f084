//! # relay-server
//!
//! HTTP proxy that serves origin registry packages under the compatibility
//! registry's alias namespace.
//!
//! Metadata is fetched from the origin on every request and rewritten so
//! that each version points at a synthesized shim tarball. Shim tarballs
//! contain one re-export module per export of the original package and
//! depend on the original package at the same version.
//!
//! - `service`: name resolution and request orchestration
//! - `translate`: metadata rewriting
//! - `synthesize`: shim tarball builds through the cache
//! - `http`: axum router
//! - `error`: error to HTTP response mapping

pub mod error;
pub mod http;
pub mod service;
pub mod synthesize;
pub mod translate;

pub use error::ApiError;
pub use http::{build_router, AppState, OMITTED_VERSIONS_HEADER};
pub use service::RegistryProxy;
pub use synthesize::TarballSynthesizer;
pub use translate::{MetadataTranslator, OmittedVersion, Translation};
