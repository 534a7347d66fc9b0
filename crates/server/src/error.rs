// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use trainview_core::{ConfigError, ConfigProblem};

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Body returned when a control operation is refused because the training
/// configuration is incomplete. Shaped like a control outcome so the
/// dashboard can show `message` the same way.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ConfigErrorResponse {
    pub success: bool,
    pub message: String,
    pub problems: Vec<ConfigProblem>,
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            ApiError::Configuration(err) => {
                tracing::warn!(error = %err, "Rejected incomplete training configuration");
                let body = ConfigErrorResponse {
                    success: false,
                    message: err.to_string(),
                    problems: err.problems().to_vec(),
                };
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn extract_body<T: serde::de::DeserializeOwned>(response: Response) -> (StatusCode, T) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_configuration_error_returns_422_with_problems() {
        let error = ApiError::Configuration(ConfigError::Incomplete(vec![
            ConfigProblem::missing("dataset", "object with a path field"),
            ConfigProblem::missing("modelType", "str"),
        ]));
        let (status, body): (_, ConfigErrorResponse) = extract_body(error.into_response()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!body.success);
        assert!(body.message.contains("dataset"));
        assert!(body.message.contains("modelType"));
        assert_eq!(body.problems.len(), 2);
        assert_eq!(body.problems[1].field(), "modelType");
    }

    #[tokio::test]
    async fn test_bad_request_returns_400() {
        let error = ApiError::BadRequest("path must not be empty".to_string());
        let (status, body): (_, ErrorResponse) = extract_body(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Bad request");
        assert_eq!(body.details.as_deref(), Some("path must not be empty"));
    }

    #[tokio::test]
    async fn test_internal_error_returns_500() {
        let error = ApiError::Internal("Something went wrong".to_string());
        let (status, body): (_, ErrorResponse) = extract_body(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        // Internal errors should NOT expose details to clients
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("Test error");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"error\":\"Test error\""));
        assert!(!json.contains("details"));

        let response = ErrorResponse::with_details("Test error", "More info");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"details\":\"More info\""));
    }

    #[test]
    fn test_api_error_from_config_error() {
        let api_err: ApiError = ConfigError::Incomplete(Vec::new()).into();
        assert!(matches!(api_err, ApiError::Configuration(_)));
    }
}
