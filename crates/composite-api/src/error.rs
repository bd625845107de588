//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use composite_core::CompositeError;
use serde::Serialize;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 404 Not Found
    NotFound(String),
    /// 502 Bad Gateway (backend reported an error)
    BadGateway(String),
    /// 503 Service Unavailable
    ServiceUnavailable(String),
    /// 504 Gateway Timeout
    GatewayTimeout(String),
    /// 500 Internal Server Error
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "API error");
        } else if status.is_client_error() {
            tracing::debug!(error = error_type, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<CompositeError> for ApiError {
    fn from(err: CompositeError) -> Self {
        let message = err.to_string();
        match err {
            CompositeError::ToolNotFound(_) | CompositeError::PromptNotFound(_) => {
                ApiError::NotFound(message)
            }
            CompositeError::BackendNotConnected(_) | CompositeError::Cancelled(_) => {
                ApiError::ServiceUnavailable(message)
            }
            CompositeError::RemoteCall(_) => ApiError::BadGateway(message),
            CompositeError::BackendStartTimeout { .. } => ApiError::GatewayTimeout(message),
            CompositeError::ConfigMissing(_)
            | CompositeError::InvalidConfig(_)
            | CompositeError::Internal(_) => ApiError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_core_taxonomy() {
        let cases = [
            CompositeError::ToolNotFound("x_y".into()),
            CompositeError::BackendNotConnected("docs".into()),
            CompositeError::RemoteCall("boom".into()),
            CompositeError::Internal("oops".into()),
        ];
        for err in cases {
            let expected = err.status_code();
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status().as_u16(), expected);
        }
    }
}
