//! HTTP client for the origin registry

use bytes::Bytes;
use reqwest::{header, Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::api::PackageMetadataResponse;
use crate::RegistryResult;
use relay_core::error::RelayError;
use relay_core::types::PackageName;

/// Connection settings for the origin registry
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Client for the origin registry
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Base registry URL
    base_url: Url,
}

impl RegistryClient {
    /// Create a client with default options
    pub fn new(base_url: Url) -> RegistryResult<Self> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a client with custom options
    pub fn with_options(base_url: Url, options: ClientOptions) -> RegistryResult<Self> {
        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(options.timeout)
            .gzip(true)
            .user_agent(options.user_agent)
            .build()
            .map_err(|e| RelayError::network("Failed to create HTTP client".to_string(), e))?;

        Ok(Self { client, base_url })
    }

    /// Base URL of the origin registry
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch and validate the metadata document of a package
    ///
    /// Non-JSON or unsuccessful responses other than 404 are returned as
    /// `RelayError::Upstream` carrying the response unchanged.
    pub async fn fetch_metadata(&self, package: &PackageName) -> RegistryResult<PackageMetadataResponse> {
        let url = self.metadata_url(package)?;
        debug!(package = %package, url = %url, "Fetching package metadata");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RelayError::network(format!("Failed to fetch metadata for {}", package), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RelayError::PackageNotFound {
                name: package.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let is_json = content_type
            .as_deref()
            .is_some_and(|value| value.starts_with("application/json"));

        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::network(format!("Failed to read metadata for {}", package), e))?;

        if !status.is_success() || !is_json {
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                content_type,
                body: body.to_vec(),
            });
        }

        let metadata: PackageMetadataResponse =
            serde_json::from_slice(&body).map_err(|e| RelayError::MalformedMetadata {
                name: package.to_string(),
                reason: e.to_string(),
            })?;
        metadata.validate()?;

        Ok(metadata)
    }

    /// Download a tarball
    pub async fn fetch_tarball(&self, tarball_url: &str) -> RegistryResult<Bytes> {
        debug!(url = %tarball_url, "Downloading tarball");

        let response = self
            .client
            .get(tarball_url)
            .send()
            .await
            .map_err(|e| RelayError::network(format!("Failed to download tarball {}", tarball_url), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RelayError::TarballNotFound {
                url: tarball_url.to_string(),
            });
        }

        if !response.status().is_success() {
            return Err(RelayError::Network {
                message: format!(
                    "Failed to download tarball {}: {}",
                    tarball_url,
                    response.status()
                ),
                source: None,
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| RelayError::network(format!("Failed to read tarball {}", tarball_url), e))
    }

    /// Metadata URL of a package: `{base}/@scope/name`
    fn metadata_url(&self, package: &PackageName) -> RegistryResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::ConfigValidation {
                field: "origin.registry_url".to_string(),
                reason: format!("{} cannot be used as a base URL", self.base_url),
            })?
            .pop_if_empty()
            .push(&format!("@{}", package.scope()))
            .push(package.name());
        Ok(url)
    }
}
