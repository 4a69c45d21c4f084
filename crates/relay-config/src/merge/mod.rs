//! Configuration layering, file discovery, and environment overrides

use crate::settings::{self, RelayConfig, VersionFailurePolicy};
use crate::{ConfigResult, CONFIG_FILE_NAME};
use camino::{Utf8Path, Utf8PathBuf};
use relay_core::error::RelayError;
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::debug;
use url::Url;

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Where the base configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// relay.toml file
    File(Utf8PathBuf),
    /// No file found, built-in defaults
    Defaults,
}

/// Overrides given on the command line (highest priority)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub listen: Option<SocketAddr>,
    pub origin: Option<Url>,
    pub public_url: Option<Url>,
}

/// Configuration layering and merging
pub struct ConfigLayering;

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Load the base configuration from an explicit path or by discovery
    pub async fn load(&self, explicit: Option<&Utf8Path>) -> ConfigResult<(RelayConfig, ConfigSource)> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.cwd.join(path)
            };
            let config = settings::load_from_file(&path).await?;
            return Ok((config, ConfigSource::File(path)));
        }

        match self.resolve_config_path(CONFIG_FILE_NAME) {
            Some(path) => {
                debug!("Loading configuration from {}", path);
                let config = settings::load_from_file(&path).await?;
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((RelayConfig::default(), ConfigSource::Defaults)),
        }
    }

    /// Find a configuration file walking up from the working directory
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.exists() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }
}

impl ConfigLayering {
    /// Merge the base configuration with environment and CLI overrides
    pub fn merge(
        base: RelayConfig,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &CliOverrides,
    ) -> ConfigResult<RelayConfig> {
        let mut merged = base;

        Self::apply_env_overrides(&mut merged, env_overrides)?;
        Self::apply_cli_overrides(&mut merged, cli_overrides);

        settings::validate_config(&merged)?;
        Ok(merged)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(
        config: &mut RelayConfig,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "RELAY_LISTEN" => config.server.listen = parse_value(key, value)?,
                "RELAY_PUBLIC_URL" => config.server.public_url = Some(parse_value(key, value)?),
                "RELAY_ORIGIN" => config.origin.registry_url = parse_value(key, value)?,
                "RELAY_ORIGIN_TIMEOUT" => config.origin.timeout_secs = parse_value(key, value)?,
                "RELAY_CACHE_TTL" => config.cache.ttl_secs = parse_value(key, value)?,
                "RELAY_CACHE_CAPACITY" => config.cache.capacity = parse_value(key, value)?,
                "RELAY_ON_VERSION_FAILURE" => {
                    config.translation.on_version_failure = match value.as_str() {
                        "omit" => VersionFailurePolicy::Omit,
                        "abort" => VersionFailurePolicy::Abort,
                        other => {
                            return Err(RelayError::ConfigValidation {
                                field: key.clone(),
                                reason: format!("Expected 'omit' or 'abort', got '{}'", other),
                            })
                        }
                    }
                }
                _ => {
                    // Unknown environment variable, ignore
                }
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut RelayConfig, overrides: &CliOverrides) {
        if let Some(listen) = overrides.listen {
            config.server.listen = listen;
        }
        if let Some(origin) = &overrides.origin {
            config.origin.registry_url = origin.clone();
        }
        if let Some(public_url) = &overrides.public_url {
            config.server.public_url = Some(public_url.clone());
        }
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("RELAY_"))
            .collect()
    }
}

fn parse_value<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| RelayError::ConfigValidation {
        field: key.to_string(),
        reason: format!("Invalid value '{}': {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_dir(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_without_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(utf8_dir(&temp_dir));

        let (config, source) = loader.load(None).await.unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(source, ConfigSource::Defaults);
    }

    #[tokio::test]
    async fn test_load_discovers_file_in_parent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&temp_dir);
        std::fs::write(root.join(CONFIG_FILE_NAME), "[cache]\nttl_secs = 42\n").unwrap();
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let loader = ConfigLoader::new(nested);
        let (config, source) = loader.load(None).await.unwrap();

        assert_eq!(config.cache.ttl_secs, 42);
        assert_eq!(source, ConfigSource::File(root.join(CONFIG_FILE_NAME)));
    }

    #[tokio::test]
    async fn test_load_explicit_missing_file_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(utf8_dir(&temp_dir));

        let result = loader.load(Some(Utf8Path::new("missing.toml"))).await;
        assert!(matches!(result, Err(RelayError::Io { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut env = HashMap::new();
        env.insert("RELAY_CACHE_TTL".to_string(), "10".to_string());
        env.insert("RELAY_ORIGIN".to_string(), "http://localhost:4873".to_string());
        env.insert("RELAY_ON_VERSION_FAILURE".to_string(), "abort".to_string());
        env.insert("RELAY_UNRELATED".to_string(), "ignored".to_string());

        let merged =
            ConfigLayering::merge(RelayConfig::default(), &env, &CliOverrides::default()).unwrap();
        assert_eq!(merged.cache.ttl_secs, 10);
        assert_eq!(merged.origin.registry_url.as_str(), "http://localhost:4873/");
        assert_eq!(merged.translation.on_version_failure, VersionFailurePolicy::Abort);
    }

    #[test]
    fn test_invalid_env_override() {
        let mut env = HashMap::new();
        env.insert("RELAY_CACHE_CAPACITY".to_string(), "lots".to_string());

        let result = ConfigLayering::merge(RelayConfig::default(), &env, &CliOverrides::default());
        assert!(matches!(result, Err(RelayError::ConfigValidation { .. })));
    }

    #[test]
    fn test_cli_overrides_win_over_env() {
        let mut env = HashMap::new();
        env.insert("RELAY_LISTEN".to_string(), "127.0.0.1:1000".to_string());
        let cli = CliOverrides {
            listen: Some("127.0.0.1:2000".parse().unwrap()),
            ..CliOverrides::default()
        };

        let merged = ConfigLayering::merge(RelayConfig::default(), &env, &cli).unwrap();
        assert_eq!(merged.server.listen.port(), 2000);
    }
}
