//! Re-export shim tarballs.
//!
//! A shim package carries only a rewritten manifest and one pair of
//! `entry/<stem>.js` / `entry/<stem>.d.ts` files per export key, each
//! re-exporting the matching path of the original package.

use indexmap::IndexMap;
use relay_core::types::{ExportTarget, Exports, PackageManifest, PackageName};
use tracing::debug;

use super::create::{create_tarball, ArchiveFile};
use super::exports::plan_shims;
use super::Tarball;
use crate::CacheResult;

/// Module type marker of every shim package
const MODULE_TYPE: &str = "module";

/// Identity of the shim being built
#[derive(Debug, Clone, Copy)]
pub struct ShimSpec<'a> {
    /// Package the shim re-exports and depends on
    pub original: &'a PackageName,
    /// Name the shim is published under
    pub alias: &'a PackageName,
    pub version: &'a str,
    pub description: Option<&'a str>,
}

/// Build the shim tarball for one version of a package
pub fn build_shim_tarball(spec: ShimSpec<'_>, origin_manifest: &PackageManifest) -> CacheResult<Tarball> {
    let original = spec.original.to_string();
    let shims = plan_shims(&origin_manifest.export_keys(), &original)?;

    let exports: IndexMap<String, ExportTarget> = shims
        .iter()
        .map(|shim| {
            (
                shim.export_key.clone(),
                ExportTarget::typed(
                    format!("./{}", shim.types_path()),
                    format!("./{}", shim.module_path()),
                ),
            )
        })
        .collect();

    let mut dependencies = IndexMap::new();
    dependencies.insert(original.clone(), spec.version.to_string());

    let manifest = PackageManifest {
        name: spec.alias.to_string(),
        version: spec.version.to_string(),
        description: spec.description.map(str::to_string),
        module_type: Some(MODULE_TYPE.to_string()),
        dependencies: Some(dependencies),
        exports: Some(Exports::Map(exports)),
    };

    let mut files = Vec::with_capacity(1 + shims.len() * 2);
    files.push(ArchiveFile::new("package.json", manifest.to_pretty_json()?));
    for shim in &shims {
        let source = shim.source();
        files.push(ArchiveFile::new(shim.module_path(), source.clone()));
        files.push(ArchiveFile::new(shim.types_path(), source));
    }

    let bytes = create_tarball(&original, &files)?;
    debug!(
        package = %spec.alias,
        version = spec.version,
        shims = shims.len(),
        size = bytes.len(),
        "Built shim tarball"
    );

    Ok(Tarball::from_bytes(bytes))
}
