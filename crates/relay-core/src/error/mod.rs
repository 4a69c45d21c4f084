//! Error types and result aliases for relay operations.
//!
//! Provides a unified error type that covers every failure the proxy can
//! hit, from name validation through tarball synthesis.

use std::sync::Arc;
use thiserror::Error;

/// Unified error type for all relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    // Validation errors
    #[error("Invalid package name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid version '{version}': not a semantic version")]
    InvalidVersion { version: String },

    #[error("Invalid Host header '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    // Registry errors
    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("Version '{version}' of package '{name}' not found in registry")]
    VersionNotFound { name: String, version: String },

    #[error("Tarball {url} not found in registry")]
    TarballNotFound { url: String },

    #[error("Upstream registry responded with status {status}")]
    Upstream {
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    },

    #[error("Upstream metadata for '{name}' is malformed: {reason}")]
    MalformedMetadata { name: String, reason: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Synthesis errors
    #[error("Could not find package.json in tarball of {package}")]
    ManifestNotFound { package: String },

    #[error("Failed to parse package.json of {package}: {message}")]
    ManifestParse { package: String, message: String },

    #[error("Export keys '{first}' and '{second}' of {package} both map to entry/{stem}")]
    ExportCollision {
        package: String,
        first: String,
        second: String,
        stem: String,
    },

    #[error("Archive error for {package}: {message}")]
    Archive {
        package: String,
        #[source]
        source: std::io::Error,
        message: String,
    },

    #[error("Tarball build for {key} did not complete: {message}")]
    BuildIncomplete { key: String, message: String },

    /// A failure produced by a build another request was already running.
    #[error(transparent)]
    Shared(Arc<RelayError>),

    // Config errors
    #[error("Failed to parse relay.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create an archive error for a package
    pub fn archive(package: &str, message: &str, source: std::io::Error) -> Self {
        Self::Archive {
            package: package.to_string(),
            source,
            message: message.to_string(),
        }
    }

    /// Strip any single-flight wrapping and return the underlying error
    pub fn root(&self) -> &RelayError {
        match self {
            RelayError::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// Check if this error is a client-side validation failure
    pub fn is_validation(&self) -> bool {
        matches!(
            self.root(),
            RelayError::InvalidName { .. }
                | RelayError::InvalidVersion { .. }
                | RelayError::InvalidHost { .. }
        )
    }

    /// Check if this error may go away when the client retries
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.root(),
            RelayError::Network { .. } | RelayError::Upstream { .. } | RelayError::Io { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self.root() {
            RelayError::InvalidName { .. } => {
                Some("Package names look like @scope/name using lowercase letters, digits and '_'")
            },
            RelayError::PackageNotFound { .. } => {
                Some("Check the package name spelling or that it is published on the origin registry")
            },
            RelayError::Network { .. } => Some("Check that the origin registry is reachable"),
            RelayError::ExportCollision { .. } => {
                Some("Two export keys normalize to the same file name; rename one of them")
            },
            RelayError::TomlParse { .. } | RelayError::ConfigValidation { .. } => {
                Some("Fix relay.toml or the RELAY_* environment variables")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_error_exposes_root() {
        let inner = RelayError::InvalidVersion {
            version: "x".to_string(),
        };
        let shared = RelayError::Shared(Arc::new(inner));

        assert!(shared.is_validation());
        assert!(matches!(shared.root(), RelayError::InvalidVersion { .. }));
        assert_eq!(shared.to_string(), "Invalid version 'x': not a semantic version");
    }

    #[test]
    fn test_recoverable_errors() {
        let err = RelayError::Upstream {
            status: 503,
            content_type: None,
            body: Vec::new(),
        };
        assert!(err.is_recoverable());

        let err = RelayError::ManifestNotFound {
            package: "@std/path".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.suggestion().is_none());
    }
}
