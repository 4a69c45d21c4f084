//! relay.toml configuration parsing

use crate::ConfigResult;
use relay_core::error::RelayError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Complete relay.toml configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// HTTP listener settings
    pub server: ServerSection,

    /// Origin registry settings
    pub origin: OriginSection,

    /// Synthesized tarball cache settings
    pub cache: CacheSection,

    /// Metadata translation settings
    pub translation: TranslationSection,
}

/// HTTP listener section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Address the proxy binds to
    pub listen: SocketAddr,

    /// Base URL written into tarball links; derived from the Host header when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<Url>,
}

/// Origin registry section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OriginSection {
    /// npm-compatible endpoint of the origin registry
    pub registry_url: Url,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent upstream
    pub user_agent: String,
}

/// Tarball cache section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    /// Seconds a synthesized tarball stays valid after it was stored
    pub ttl_secs: u64,

    /// Maximum number of cached tarballs
    pub capacity: usize,
}

/// Metadata translation section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslationSection {
    /// What to do when one version's tarball cannot be synthesized
    pub on_version_failure: VersionFailurePolicy,
}

/// Handling of per-version synthesis failures during translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionFailurePolicy {
    /// Drop failing versions and report them
    #[default]
    Omit,
    /// Fail the whole metadata response
    Abort,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8000)),
            public_url: None,
        }
    }
}

impl Default for OriginSection {
    fn default() -> Self {
        Self {
            registry_url: Url::parse("https://npm.jsr.io").expect("static origin URL is valid"),
            timeout_secs: 30,
            user_agent: concat!("relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60,
            capacity: 1024,
        }
    }
}

impl OriginSection {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheSection {
    /// Entry lifetime as a Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Parse relay.toml content with line/column error reporting
pub fn parse_relay_toml(content: &str) -> ConfigResult<RelayConfig> {
    let config: RelayConfig = toml::from_str(content).map_err(|e| {
        let (line, column) = e
            .span()
            .map(|span| line_and_column(content, span.start))
            .unwrap_or((0, 0));
        RelayError::TomlParse {
            message: e.message().to_string(),
            line,
            column,
        }
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Serialize configuration back to TOML
pub fn serialize_relay_toml(config: &RelayConfig) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| RelayError::ConfigValidation {
        field: "config".to_string(),
        reason: format!("Failed to serialize configuration: {}", e),
    })
}

/// Load relay.toml from a file
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<RelayConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RelayError::io(format!("Failed to read {}", path), e))?;

    parse_relay_toml(&content).map_err(|e| match e {
        RelayError::TomlParse {
            message,
            line,
            column,
        } => RelayError::TomlParse {
            message: format!("In file {}: {}", path, message),
            line,
            column,
        },
        other => other,
    })
}

/// Check values serde cannot reject on its own
pub fn validate_config(config: &RelayConfig) -> ConfigResult<()> {
    if !matches!(config.origin.registry_url.scheme(), "http" | "https") {
        return Err(RelayError::ConfigValidation {
            field: "origin.registry_url".to_string(),
            reason: format!(
                "Unsupported scheme '{}', expected http or https",
                config.origin.registry_url.scheme()
            ),
        });
    }

    if let Some(public_url) = &config.server.public_url {
        if !matches!(public_url.scheme(), "http" | "https") {
            return Err(RelayError::ConfigValidation {
                field: "server.public_url".to_string(),
                reason: format!("Unsupported scheme '{}'", public_url.scheme()),
            });
        }
    }

    if config.origin.timeout_secs == 0 {
        return Err(RelayError::ConfigValidation {
            field: "origin.timeout_secs".to_string(),
            reason: "Timeout must be at least one second".to_string(),
        });
    }

    if config.cache.ttl_secs == 0 {
        return Err(RelayError::ConfigValidation {
            field: "cache.ttl_secs".to_string(),
            reason: "TTL must be at least one second".to_string(),
        });
    }

    if config.cache.capacity == 0 {
        return Err(RelayError::ConfigValidation {
            field: "cache.capacity".to_string(),
            reason: "Capacity must hold at least one tarball".to_string(),
        });
    }

    Ok(())
}

/// 1-based line and column of a byte offset
fn line_and_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_relay_toml("").unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.origin.registry_url.as_str(), "https://npm.jsr.io/");
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.translation.on_version_failure, VersionFailurePolicy::Omit);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
listen = "0.0.0.0:9000"
public_url = "https://relay.example.com"

[origin]
registry_url = "http://localhost:4873"
timeout_secs = 5
user_agent = "relay-test"

[cache]
ttl_secs = 60
capacity = 16

[translation]
on_version_failure = "abort"
"#;

        let config = parse_relay_toml(toml).unwrap();
        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(
            config.server.public_url.as_ref().map(Url::as_str),
            Some("https://relay.example.com/")
        );
        assert_eq!(config.origin.timeout(), Duration::from_secs(5));
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.translation.on_version_failure, VersionFailurePolicy::Abort);
    }

    #[test]
    fn test_parse_error_reports_location() {
        let toml = "[cache]\nttl_secs = \"soon\"\n";

        match parse_relay_toml(toml) {
            Err(RelayError::TomlParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected TomlParse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(parse_relay_toml("[cache]\nsize = 3\n").is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse_relay_toml("[cache]\ncapacity = 0\n"),
            Err(RelayError::ConfigValidation { .. })
        ));
        assert!(matches!(
            parse_relay_toml("[origin]\nregistry_url = \"ftp://example.com\"\n"),
            Err(RelayError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_round_trip_serialization() {
        let mut config = RelayConfig::default();
        config.cache.ttl_secs = 120;
        config.translation.on_version_failure = VersionFailurePolicy::Abort;

        let serialized = serialize_relay_toml(&config).unwrap();
        assert_eq!(parse_relay_toml(&serialized).unwrap(), config);
    }

    #[test]
    fn test_line_and_column() {
        assert_eq!(line_and_column("abc", 0), (1, 1));
        assert_eq!(line_and_column("ab\ncd", 4), (2, 2));
    }
}
