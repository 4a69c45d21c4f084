//! Metadata translation into the alias namespace.
//!
//! Every version of the origin document is rewritten to point at its shim
//! tarball on this proxy and to depend on the original package at the
//! same version. Versions are translated concurrently.

use futures::future::join_all;
use indexmap::IndexMap;
use relay_cache::{Tarball, TarballCache};
use relay_config::VersionFailurePolicy;
use relay_core::error::{RelayError, RelayResult};
use relay_core::types::{PackageName, PackageNames};
use relay_registry::{DistInfo, PackageMetadataResponse, VersionMetadata};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::synthesize::TarballSynthesizer;

/// Result of translating one metadata document
#[derive(Debug, Clone)]
pub struct Translation {
    pub metadata: PackageMetadataResponse,
    /// Versions dropped because their shim could not be built
    pub omitted: Vec<OmittedVersion>,
}

/// A version left out of a translated document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmittedVersion {
    pub version: String,
    pub reason: String,
}

/// Rewrites origin metadata documents into the alias namespace
#[derive(Debug, Clone)]
pub struct MetadataTranslator {
    synthesizer: TarballSynthesizer,
    cache: Arc<TarballCache>,
    policy: VersionFailurePolicy,
}

impl MetadataTranslator {
    pub fn new(
        synthesizer: TarballSynthesizer,
        cache: Arc<TarballCache>,
        policy: VersionFailurePolicy,
    ) -> Self {
        Self {
            synthesizer,
            cache,
            policy,
        }
    }

    /// Translate a metadata document for clients reaching us at `response_origin`
    pub async fn translate(
        &self,
        original: &PackageMetadataResponse,
        names: &PackageNames,
        response_origin: &Url,
    ) -> RelayResult<Translation> {
        let results = join_all(original.versions.iter().map(|(key, version)| async move {
            let translated = self
                .translate_version(key, version, names, response_origin)
                .await;
            (key, translated)
        }))
        .await;

        let mut versions = IndexMap::with_capacity(results.len());
        let mut omitted = Vec::new();
        let mut first_error = None;

        for (key, result) in results {
            match result {
                Ok(translated) => {
                    versions.insert(key.clone(), translated);
                }
                Err(error) => {
                    warn!(
                        package = %names.alias,
                        version = %key,
                        error = %error,
                        "Failed to synthesize shim tarball"
                    );
                    omitted.push(OmittedVersion {
                        version: key.clone(),
                        reason: error.to_string(),
                    });
                    first_error.get_or_insert(error);
                }
            }
        }

        if let Some(error) = first_error {
            if self.policy == VersionFailurePolicy::Abort || versions.is_empty() {
                return Err(error);
            }
        }

        let dist_tags = original
            .dist_tags
            .iter()
            .filter(|(_, version)| !omitted.iter().any(|o| &o.version == *version))
            .map(|(tag, version)| (tag.clone(), version.clone()))
            .collect();

        debug!(
            package = %names.alias,
            versions = versions.len(),
            omitted = omitted.len(),
            "Translated package metadata"
        );

        Ok(Translation {
            metadata: PackageMetadataResponse {
                name: names.alias.to_string(),
                description: original.description.clone(),
                dist_tags,
                versions,
                time: original.time.clone(),
                extra: IndexMap::new(),
            },
            omitted,
        })
    }

    /// Shim tarball of one version, from the cache when possible
    pub async fn tarball(
        &self,
        version_key: &str,
        version: &VersionMetadata,
        names: &PackageNames,
    ) -> RelayResult<Tarball> {
        self.synthesizer
            .get_or_synthesize(&self.cache, version_key, version, names)
            .await
    }

    async fn translate_version(
        &self,
        version_key: &str,
        version: &VersionMetadata,
        names: &PackageNames,
        response_origin: &Url,
    ) -> RelayResult<VersionMetadata> {
        let tarball = self.tarball(version_key, version, names).await?;

        let mut dependencies = IndexMap::new();
        dependencies.insert(names.original.to_string(), version.version.clone());

        Ok(VersionMetadata {
            name: names.alias.to_string(),
            description: version.description.clone(),
            version: version.version.clone(),
            dist: DistInfo {
                tarball: tarball_url(response_origin, &names.alias, version_key)?.to_string(),
                shasum: tarball.shasum,
                integrity: tarball.integrity,
            },
            dependencies,
            extra: IndexMap::new(),
        })
    }
}

/// `{origin}/{alias}/-/{version}.tgz`
pub fn tarball_url(response_origin: &Url, alias: &PackageName, version: &str) -> RelayResult<Url> {
    let mut url = response_origin.clone();
    url.path_segments_mut()
        .map_err(|_| RelayError::ConfigValidation {
            field: "server.public_url".to_string(),
            reason: format!("{} cannot be used as a base URL", response_origin),
        })?
        .pop_if_empty()
        .push(&format!("@{}", alias.scope()))
        .push(alias.name())
        .push("-")
        .push(&format!("{}.tgz", version));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tarball_url() {
        let alias = PackageName::parse("@jsr/scope__pkg").unwrap();

        let origin = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            tarball_url(&origin, &alias, "1.2.3").unwrap().as_str(),
            "http://localhost:8000/@jsr/scope__pkg/-/1.2.3.tgz"
        );

        let origin = Url::parse("https://relay.example.com/npm/").unwrap();
        assert_eq!(
            tarball_url(&origin, &alias, "1.0.0-rc.1").unwrap().as_str(),
            "https://relay.example.com/npm/@jsr/scope__pkg/-/1.0.0-rc.1.tgz"
        );
    }

    #[test]
    fn test_tarball_url_rejects_opaque_origin() {
        let alias = PackageName::parse("@jsr/scope__pkg").unwrap();
        let origin = Url::parse("mailto:someone@example.com").unwrap();
        assert!(tarball_url(&origin, &alias, "1.2.3").is_err());
    }
}
