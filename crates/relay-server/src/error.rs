//! Mapping of relay errors onto HTTP responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_core::error::RelayError;
use serde_json::json;
use tracing::{error, warn};

/// A relay error on its way to an HTTP client
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(error: RelayError) -> Self {
        Self(error)
    }
}

impl ApiError {
    /// Status code the error is reported with
    pub fn status(&self) -> StatusCode {
        match self.0.root() {
            RelayError::InvalidName { .. }
            | RelayError::InvalidVersion { .. }
            | RelayError::InvalidHost { .. } => StatusCode::BAD_REQUEST,
            RelayError::PackageNotFound { .. }
            | RelayError::VersionNotFound { .. }
            | RelayError::TarballNotFound { .. } => StatusCode::NOT_FOUND,
            RelayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            RelayError::MalformedMetadata { .. } | RelayError::Network { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Origin failures are relayed as the origin sent them
        if let RelayError::Upstream {
            content_type, body, ..
        } = self.0.root()
        {
            warn!(status = %status, "Forwarding upstream registry failure");
            let mut response = (status, body.clone()).into_response();
            if let Some(value) = content_type
                .as_deref()
                .and_then(|ct| HeaderValue::from_str(ct).ok())
            {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            return response;
        }

        if status.is_server_error() {
            error!(status = %status, error = %self.0, "Request failed");
        }

        let mut body = json!({ "error": self.0.to_string() });
        if let Some(suggestion) = self.0.suggestion() {
            body["hint"] = json!(suggestion);
        }
        (status, Json(body)).into_response()
    }
}
