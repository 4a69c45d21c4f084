//! Manifest extraction from origin tarballs
//!
//! Streams through a gzipped tarball in memory and returns the parsed
//! `package/package.json` without unpacking anything else.

use flate2::read::GzDecoder;
use relay_core::error::RelayError;
use relay_core::types::PackageManifest;
use std::io::Read;
use std::path::{Component, Path};
use tar::Archive;

use super::PACKAGE_ROOT;
use crate::CacheResult;

/// Name of the manifest file at the package root
const MANIFEST_FILE: &str = "package.json";

/// Read and parse the manifest of a gzipped npm tarball
pub fn read_manifest(tarball: &[u8], package: &str) -> CacheResult<PackageManifest> {
    let mut archive = Archive::new(GzDecoder::new(tarball));

    let entries = archive
        .entries()
        .map_err(|e| RelayError::archive(package, "Failed to read tarball", e))?;

    for entry_result in entries {
        let mut entry =
            entry_result.map_err(|e| RelayError::archive(package, "Corrupt tarball entry", e))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let is_manifest = entry
            .path()
            .map(|path| is_manifest_path(&path))
            .map_err(|e| RelayError::archive(package, "Invalid entry path", e))?;
        if !is_manifest {
            continue;
        }

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| RelayError::archive(package, "Failed to read package.json", e))?;

        return PackageManifest::from_slice(&contents, package);
    }

    Err(RelayError::ManifestNotFound {
        package: package.to_string(),
    })
}

/// Whether an entry path is `package/package.json`, ignoring `./` segments
fn is_manifest_path(path: &Path) -> bool {
    let mut normal = path.components().filter_map(|component| match component {
        Component::Normal(name) => Some(name),
        _ => None,
    });

    matches!(
        (normal.next(), normal.next(), normal.next()),
        (Some(root), Some(file), None) if root == PACKAGE_ROOT && file == MANIFEST_FILE
    )
}
