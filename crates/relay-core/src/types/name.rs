//! Scoped package names and the alias mapping.
//!
//! Every origin package `@scope/name` is exposed under the reserved scope as
//! `@jsr/scope__name`. Packages already living in the reserved scope keep
//! their name.

use crate::error::{RelayError, RelayResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Scope whose packages are never rewritten
pub const RESERVED_SCOPE: &str = "jsr";

/// Joins the origin scope and name inside an alias
pub const SCOPE_SEPARATOR: &str = "__";

/// A validated `@scope/name` package name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName {
    scope: String,
    name: String,
}

impl PackageName {
    /// Build a name from its parts, tolerating a leading `@` on the scope
    pub fn new(scope: &str, name: &str) -> RelayResult<Self> {
        let scope = scope.strip_prefix('@').unwrap_or(scope);
        let display = format!("@{}/{}", scope, name);

        if !is_valid_scope(scope) {
            return Err(RelayError::InvalidName {
                name: display,
                reason: "scope must be lowercase letters and digits".to_string(),
            });
        }
        if !is_valid_local_name(name) {
            return Err(RelayError::InvalidName {
                name: display,
                reason: "name must be lowercase letters, digits and '_'".to_string(),
            });
        }

        Ok(Self {
            scope: scope.to_string(),
            name: name.to_string(),
        })
    }

    /// Parse `@scope/name`
    pub fn parse(input: &str) -> RelayResult<Self> {
        let invalid = |reason: &str| RelayError::InvalidName {
            name: input.to_string(),
            reason: reason.to_string(),
        };

        let rest = input
            .strip_prefix('@')
            .ok_or_else(|| invalid("expected a scoped name starting with '@'"))?;
        let (scope, name) = rest
            .split_once('/')
            .ok_or_else(|| invalid("expected '@scope/name'"))?;

        Self::new(scope, name)
    }

    /// Scope without the leading `@`
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Local name segment
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this name lives in the reserved alias scope
    pub fn is_reserved(&self) -> bool {
        self.scope == RESERVED_SCOPE
    }

    /// Alias name in the compatibility registry
    pub fn to_alias(&self) -> PackageName {
        if self.is_reserved() {
            return self.clone();
        }
        PackageName {
            scope: RESERVED_SCOPE.to_string(),
            name: format!("{}{}{}", self.scope, SCOPE_SEPARATOR, self.name),
        }
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/{}", self.scope, self.name)
    }
}

impl FromStr for PackageName {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Map an origin scope and name to the alias name
pub fn to_alias(scope: &str, name: &str) -> RelayResult<PackageName> {
    Ok(PackageName::new(scope, name)?.to_alias())
}

/// Recover the origin name from an alias name
///
/// A reserved-scope name without a separator is an identity alias and maps
/// to itself. Names outside the reserved scope are not aliases at all.
pub fn from_alias(alias: &str) -> RelayResult<PackageName> {
    let parsed = PackageName::parse(alias)?;

    if !parsed.is_reserved() {
        return Err(RelayError::InvalidName {
            name: alias.to_string(),
            reason: format!("aliases live in the @{} scope", RESERVED_SCOPE),
        });
    }

    match parsed.name.split_once(SCOPE_SEPARATOR) {
        Some((scope, name)) => PackageName::new(scope, name),
        None => Ok(parsed),
    }
}

/// The origin name and alias name of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNames {
    /// Name the package is published under on the origin
    pub original: PackageName,
    /// Name the package is exposed under by the proxy
    pub alias: PackageName,
}

impl PackageNames {
    /// Resolve a requested name given in either origin or alias form
    pub fn resolve(requested: &PackageName) -> RelayResult<Self> {
        let original = if requested.is_reserved() {
            from_alias(&requested.to_string())?
        } else {
            requested.clone()
        };
        let alias = original.to_alias();

        Ok(Self { original, alias })
    }

    /// Whether the package needs no rewriting at all
    pub fn is_identity(&self) -> bool {
        self.original == self.alias
    }
}

fn is_valid_scope(scope: &str) -> bool {
    !scope.is_empty()
        && scope
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn is_valid_local_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
