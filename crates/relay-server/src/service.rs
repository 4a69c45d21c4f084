//! Registry proxy service.
//!
//! Resolves requested names, fetches origin metadata on every request and
//! hands it to the translator or the tarball cache.

use relay_cache::{Tarball, TarballCache};
use relay_config::RelayConfig;
use relay_core::error::{RelayError, RelayResult};
use relay_core::types::{validate_version, PackageName, PackageNames};
use relay_registry::{ClientOptions, PackageMetadataResponse, RegistryClient};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::synthesize::TarballSynthesizer;
use crate::translate::{MetadataTranslator, Translation};

/// Serves translated metadata and shim tarballs
#[derive(Debug, Clone)]
pub struct RegistryProxy {
    client: RegistryClient,
    translator: MetadataTranslator,
}

impl RegistryProxy {
    /// Assemble the proxy around an origin client and a shared cache
    pub fn new(client: RegistryClient, cache: Arc<TarballCache>, config: &RelayConfig) -> Self {
        let synthesizer = TarballSynthesizer::new(client.clone());
        let translator = MetadataTranslator::new(
            synthesizer,
            cache,
            config.translation.on_version_failure,
        );

        Self { client, translator }
    }

    /// Build the origin client from configuration and assemble the proxy
    pub fn from_config(config: &RelayConfig, cache: Arc<TarballCache>) -> RelayResult<Self> {
        let options = ClientOptions {
            timeout: config.origin.timeout(),
            user_agent: config.origin.user_agent.clone(),
        };
        let client = RegistryClient::with_options(config.origin.registry_url.clone(), options)?;

        Ok(Self::new(client, cache, config))
    }

    /// Metadata document of a package in the alias namespace
    pub async fn package_metadata(
        &self,
        requested: &PackageName,
        response_origin: &Url,
    ) -> RelayResult<Translation> {
        let names = PackageNames::resolve(requested)?;
        let metadata = self.client.fetch_metadata(&names.alias).await?;

        if names.is_identity() {
            debug!(package = %names.alias, "Serving reserved-scope package unchanged");
            return Ok(Translation {
                metadata,
                omitted: Vec::new(),
            });
        }

        self.translator
            .translate(&metadata, &names, response_origin)
            .await
    }

    /// Tarball of one version: the shim, or the origin tarball for
    /// reserved-scope packages
    pub async fn tarball(&self, requested: &PackageName, version: &str) -> RelayResult<Tarball> {
        validate_version(version)?;

        let names = PackageNames::resolve(requested)?;
        let metadata = self.client.fetch_metadata(&names.alias).await?;
        let version_metadata = find_version(&metadata, &names, version)?;

        if names.is_identity() {
            let bytes = self
                .client
                .fetch_tarball(&version_metadata.dist.tarball)
                .await?;
            return Ok(Tarball::from_bytes(bytes));
        }

        self.translator
            .tarball(version, version_metadata, &names)
            .await
    }
}

fn find_version<'a>(
    metadata: &'a PackageMetadataResponse,
    names: &PackageNames,
    version: &str,
) -> RelayResult<&'a relay_registry::VersionMetadata> {
    metadata
        .version(version)
        .ok_or_else(|| RelayError::VersionNotFound {
            name: names.alias.to_string(),
            version: version.to_string(),
        })
}
