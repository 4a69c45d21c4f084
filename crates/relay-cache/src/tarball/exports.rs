//! Export key to shim file mapping.
//!
//! Each export key of the origin package becomes one file stem under
//! `entry/`: `./foo/bar` becomes `foo_bar`, the root export becomes `index`.

use relay_core::error::RelayError;
use std::collections::HashMap;

use crate::CacheResult;

/// Directory holding generated shim files
pub const ENTRY_DIR: &str = "entry";

/// Stem used for the root export
const INDEX_STEM: &str = "index";

/// One export key and the shim generated for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimEntry {
    /// Export key as written in the origin manifest
    pub export_key: String,
    /// File stem under `entry/`
    pub stem: String,
    /// Module specifier the shim re-exports
    pub specifier: String,
}

impl ShimEntry {
    /// `entry/<stem>.js`
    pub fn module_path(&self) -> String {
        format!("{}/{}.js", ENTRY_DIR, self.stem)
    }

    /// `entry/<stem>.d.ts`
    pub fn types_path(&self) -> String {
        format!("{}/{}.d.ts", ENTRY_DIR, self.stem)
    }

    /// Source text shared by the module and declaration shims
    pub fn source(&self) -> String {
        format!("export * from \"{}\";", self.specifier)
    }
}

/// Export key without its leading `./` or `.`
fn strip_dot(export_key: &str) -> &str {
    let rest = export_key.strip_prefix('.').unwrap_or(export_key);
    rest.strip_prefix('/').unwrap_or(rest)
}

/// File stem for an export key
pub fn export_stem(export_key: &str) -> String {
    let stem = strip_dot(export_key).replace('/', "_");
    if stem.is_empty() {
        INDEX_STEM.to_string()
    } else {
        stem
    }
}

/// Specifier that resolves `export_key` of the original package
pub fn import_specifier(original: &str, export_key: &str) -> String {
    match strip_dot(export_key) {
        "" => original.to_string(),
        sub_path => format!("{}/{}", original, sub_path),
    }
}

/// Plan one shim per export key, rejecting keys that share a stem
pub fn plan_shims(export_keys: &[&str], original: &str) -> CacheResult<Vec<ShimEntry>> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(export_keys.len());
    let mut shims = Vec::with_capacity(export_keys.len());

    for &export_key in export_keys {
        let stem = export_stem(export_key);

        if let Some(first) = seen.insert(stem.clone(), export_key) {
            return Err(RelayError::ExportCollision {
                package: original.to_string(),
                first: first.to_string(),
                second: export_key.to_string(),
                stem,
            });
        }

        shims.push(ShimEntry {
            export_key: export_key.to_string(),
            specifier: import_specifier(original, export_key),
            stem,
        });
    }

    Ok(shims)
}
