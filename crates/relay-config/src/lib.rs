//! Configuration parsing for the relay registry proxy
//!
//! This crate handles parsing and validation of relay.toml, layering
//! environment and command-line overrides on top of it.

pub mod merge;
pub mod settings;

// Re-export main types
pub use merge::{CliOverrides, ConfigLayering, ConfigLoader, ConfigSource};
pub use settings::{
    CacheSection, OriginSection, RelayConfig, ServerSection, TranslationSection,
    VersionFailurePolicy,
};

use relay_core::error::RelayError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, RelayError>;

/// File name looked up in the working directory and its parents
pub const CONFIG_FILE_NAME: &str = "relay.toml";
