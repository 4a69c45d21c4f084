//! Semantic version validation.
//!
//! Versions travel through the proxy as plain strings (map keys, cache keys,
//! URL segments); they only need to be checked, never compared.

use crate::error::{RelayError, RelayResult};

/// Check that `version` follows the semantic versioning grammar
pub fn validate_version(version: &str) -> RelayResult<()> {
    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|_| RelayError::InvalidVersion {
            version: version.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_versions() {
        for version in ["0.0.0", "1.2.3", "1.0.0-alpha.1", "1.0.0+build.5", "10.20.30-rc.1+sha.abc"] {
            assert!(validate_version(version).is_ok(), "{} should be valid", version);
        }
    }

    #[test]
    fn test_invalid_versions() {
        for version in ["", "1", "1.2", "01.2.3", "1.2.3.4", "v1.2.3", "not-a-version", "latest"] {
            assert!(
                matches!(validate_version(version), Err(RelayError::InvalidVersion { .. })),
                "{} should be invalid",
                version
            );
        }
    }
}
