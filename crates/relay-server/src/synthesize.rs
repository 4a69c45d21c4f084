//! Shim tarball synthesis from origin tarballs.

use relay_cache::{build_shim_tarball, read_manifest, CacheKey, ShimSpec, Tarball, TarballCache};
use relay_core::error::RelayResult;
use relay_core::types::PackageNames;
use relay_registry::{RegistryClient, VersionMetadata};
use tracing::info;

/// Builds shim tarballs, fetching the origin tarball for each build
#[derive(Debug, Clone)]
pub struct TarballSynthesizer {
    client: RegistryClient,
}

impl TarballSynthesizer {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    /// Build the shim tarball of one version without consulting any cache
    pub async fn synthesize(&self, version: &VersionMetadata, names: &PackageNames) -> RelayResult<Tarball> {
        let original = names.original.to_string();

        let origin_tarball = self.client.fetch_tarball(&version.dist.tarball).await?;
        let manifest = read_manifest(&origin_tarball, &original)?;

        let spec = ShimSpec {
            original: &names.original,
            alias: &names.alias,
            version: &version.version,
            description: version.description.as_deref(),
        };
        let tarball = build_shim_tarball(spec, &manifest)?;

        info!(
            package = %names.alias,
            version = %version.version,
            shasum = %tarball.shasum,
            "Synthesized shim tarball"
        );
        Ok(tarball)
    }

    /// Cached shim tarball of `version_key`, synthesizing it on a miss
    pub async fn get_or_synthesize(
        &self,
        cache: &TarballCache,
        version_key: &str,
        version: &VersionMetadata,
        names: &PackageNames,
    ) -> RelayResult<Tarball> {
        let key = CacheKey::new(names.alias.to_string(), version_key);

        let synthesizer = self.clone();
        let version = version.clone();
        let names = names.clone();

        cache
            .try_get(key, move || async move { synthesizer.synthesize(&version, &names).await })
            .await
    }
}
