//! HTTP surface of the proxy.
//!
//! Routes:
//! - `GET /@scope/name` and `GET /@scope%2fname`: translated metadata
//! - `GET /@scope/name/-/{version}.tgz`: shim tarball
//!
//! Every other path is answered with 400.

use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use relay_core::error::{RelayError, RelayResult};
use relay_core::types::PackageName;
use serde_json::json;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;
use url::Url;

use crate::error::ApiError;
use crate::service::RegistryProxy;

/// Header listing versions left out of a translated document
pub const OMITTED_VERSIONS_HEADER: &str = "x-relay-omitted-versions";

const TARBALL_SUFFIX: &str = ".tgz";
const TARBALL_CONTENT_TYPE: &str = "application/gzip";

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub proxy: Arc<RegistryProxy>,
    /// Origin advertised in tarball URLs; derived from each request when unset
    pub public_url: Option<Url>,
}

/// Build the proxy router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/:package", get(encoded_metadata))
        .route("/:scope/:name", get(metadata))
        .route("/:scope/:name/-/:file", get(tarball))
        .fallback(unknown_route)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn encoded_metadata(
    State(state): State<AppState>,
    Path(package): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let requested = PackageName::parse(&package)?;
    serve_metadata(&state, &requested, &headers).await
}

async fn metadata(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let requested = PackageName::parse(&format!("{}/{}", scope, name))?;
    serve_metadata(&state, &requested, &headers).await
}

async fn serve_metadata(
    state: &AppState,
    requested: &PackageName,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let origin = response_origin(state.public_url.as_ref(), headers)?;
    let translation = state.proxy.package_metadata(requested, &origin).await?;

    let mut response = Json(translation.metadata).into_response();
    if !translation.omitted.is_empty() {
        let versions = translation
            .omitted
            .iter()
            .map(|omitted| omitted.version.as_str())
            .collect::<Vec<_>>()
            .join(",");
        if let Ok(value) = HeaderValue::from_str(&versions) {
            response.headers_mut().insert(OMITTED_VERSIONS_HEADER, value);
        }
    }
    Ok(response)
}

async fn tarball(
    State(state): State<AppState>,
    Path((scope, name, file)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let requested = PackageName::parse(&format!("{}/{}", scope, name))?;
    let version = file
        .strip_suffix(TARBALL_SUFFIX)
        .ok_or_else(|| RelayError::InvalidVersion {
            version: file.clone(),
        })?;

    let tarball = state.proxy.tarball(&requested, version).await?;

    Ok((
        [(header::CONTENT_TYPE, TARBALL_CONTENT_TYPE)],
        tarball.bytes,
    )
        .into_response())
}

async fn unknown_route() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Expected /@scope/name or /@scope/name/-/version.tgz" })),
    )
        .into_response()
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );
    response
}

/// Origin clients reach the proxy at
///
/// The configured public URL wins. Otherwise the `Host` header is used,
/// with the scheme taken from `X-Forwarded-Proto` when a front proxy set it.
pub fn response_origin(public_url: Option<&Url>, headers: &HeaderMap) -> RelayResult<Url> {
    if let Some(url) = public_url {
        return Ok(url.clone());
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .filter(|proto| matches!(*proto, "http" | "https"))
        .unwrap_or("http");

    Url::parse(&format!("{}://{}", scheme, host)).map_err(|e| RelayError::InvalidHost {
        host: host.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_origin_prefers_public_url() {
        let public = Url::parse("https://relay.example.com/").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8000"));

        assert_eq!(response_origin(Some(&public), &headers).unwrap(), public);
    }

    #[test]
    fn test_response_origin_from_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:8000"));
        assert_eq!(
            response_origin(None, &headers).unwrap().as_str(),
            "http://localhost:8000/"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            response_origin(None, &headers).unwrap().as_str(),
            "https://localhost:8000/"
        );
    }

    #[test]
    fn test_response_origin_rejects_unparsable_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("bad host:80"));

        let error = response_origin(None, &headers).unwrap_err();
        assert!(matches!(error, RelayError::InvalidHost { ref host, .. } if host == "bad host:80"));
        assert!(error.to_string().starts_with("Invalid Host header"));
    }

    #[test]
    fn test_response_origin_ignores_unknown_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("relay.local"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("gopher"));

        assert_eq!(
            response_origin(None, &headers).unwrap().as_str(),
            "http://relay.local/"
        );
    }
}
