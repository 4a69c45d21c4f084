//! Package manifest types.
//!
//! Defines the `package.json` shape read from origin tarballs and written
//! into synthesized ones.

use crate::error::{RelayError, RelayResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Export key of the package root
pub const ROOT_EXPORT: &str = ".";

/// `package.json` found at `package/package.json` inside a tarball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Module type marker (`module` or `commonjs`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub module_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<IndexMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Exports>,
}

/// The `exports` field: either one path for the root or a map of sub-paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exports {
    Path(String),
    Map(IndexMap<String, ExportTarget>),
}

/// Target of one export key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportTarget {
    /// Plain file path
    Path(String),
    /// Condition object such as `{ "types": ..., "default": ... }`
    Conditions(IndexMap<String, serde_json::Value>),
}

impl PackageManifest {
    /// Parse a manifest, attributing failures to `package`
    pub fn from_slice(bytes: &[u8], package: &str) -> RelayResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| RelayError::ManifestParse {
            package: package.to_string(),
            message: e.to_string(),
        })
    }

    /// Export keys in declaration order
    ///
    /// A manifest without a sub-path map only exports its root.
    pub fn export_keys(&self) -> Vec<&str> {
        match &self.exports {
            Some(Exports::Map(map)) if !map.is_empty() => map.keys().map(String::as_str).collect(),
            _ => vec![ROOT_EXPORT],
        }
    }

    /// Serialize as pretty-printed JSON
    pub fn to_pretty_json(&self) -> RelayResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| RelayError::ManifestParse {
            package: self.name.clone(),
            message: e.to_string(),
        })
    }
}

impl ExportTarget {
    /// Condition object with `types` and `default` entries
    pub fn typed(types: String, default: String) -> Self {
        let mut conditions = IndexMap::new();
        conditions.insert("types".to_string(), serde_json::Value::String(types));
        conditions.insert("default".to_string(), serde_json::Value::String(default));
        ExportTarget::Conditions(conditions)
    }
}
