//! npm-style registry API response types

use crate::RegistryResult;
use indexmap::IndexMap;
use relay_core::error::RelayError;
use relay_core::types::{validate_version, PackageName};
use serde::{Deserialize, Serialize};
use url::Url;

/// Package metadata document (packument)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PackageMetadataResponse {
    /// Package name
    pub name: String,
    /// Package description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tag to version mapping
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: IndexMap<String, String>,
    /// All versions metadata
    #[serde(default)]
    pub versions: IndexMap<String, VersionMetadata>,
    /// Publication timestamps keyed by version, `created` and `modified`
    #[serde(default)]
    pub time: IndexMap<String, String>,
    /// Fields the proxy does not interpret
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// Metadata for a specific package version
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VersionMetadata {
    /// Package name
    pub name: String,
    /// Package description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Version string
    pub version: String,
    /// Distribution information
    pub dist: DistInfo,
    /// Dependencies
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    /// Fields the proxy does not interpret
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// Distribution information for package tarball
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DistInfo {
    /// Tarball download URL
    pub tarball: String,
    /// SHA-1 checksum
    pub shasum: String,
    /// Subresource integrity hash
    pub integrity: String,
}

impl PackageMetadataResponse {
    /// Check the invariants translation relies on
    pub fn validate(&self) -> RegistryResult<()> {
        let malformed = |reason: String| RelayError::MalformedMetadata {
            name: self.name.clone(),
            reason,
        };

        PackageName::parse(&self.name).map_err(|e| malformed(e.to_string()))?;

        for (key, version) in &self.versions {
            validate_version(key).map_err(|e| malformed(e.to_string()))?;

            Url::parse(&version.dist.tarball).map_err(|e| {
                malformed(format!("version {} has an invalid tarball URL: {}", key, e))
            })?;
        }

        for (tag, version) in &self.dist_tags {
            validate_version(version)
                .map_err(|_| malformed(format!("dist-tag '{}' points at '{}'", tag, version)))?;
        }

        Ok(())
    }

    /// Look up one version
    pub fn version(&self, version: &str) -> Option<&VersionMetadata> {
        self.versions.get(version)
    }
}
