// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether 500 responses carry the underlying error text in `details`.
static EXPOSE_INTERNAL_DETAILS: AtomicBool = AtomicBool::new(false);

/// Toggle internal error details in responses (off in production).
pub fn expose_internal_details(enabled: bool) {
    EXPOSE_INTERNAL_DETAILS.store(enabled, Ordering::Relaxed);
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input data")]
    Validation(Vec<FieldError>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Authorization token required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidToken | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::AiProvider(_)
            | AppError::Storage(_)
            | AppError::Identity(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::AiProvider(_) => "analysis_failed",
            AppError::Storage(_) => "storage_error",
            AppError::Identity(_) => "identity_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let expose = EXPOSE_INTERNAL_DETAILS.load(Ordering::Relaxed);

        let (message, details) = match &self {
            AppError::Validation(errors) => (
                Some(self.to_string()),
                serde_json::to_value(errors).ok(),
            ),
            AppError::BadRequest(msg) | AppError::Forbidden(msg) | AppError::NotFound(msg) => {
                (Some(msg.clone()), None)
            }
            AppError::Unauthorized => (
                Some("Include the header Authorization: Bearer <token>".to_string()),
                None,
            ),
            AppError::InvalidToken => (Some("Please log in again".to_string()), None),
            AppError::InvalidCredentials => (Some(self.to_string()), None),
            AppError::RateLimited { retry_after_secs } => (
                Some(format!(
                    "Too many requests from this IP, try again in {} seconds",
                    retry_after_secs
                )),
                None,
            ),
            AppError::AiProvider(msg) => {
                tracing::error!(error = %msg, "Market analysis failed");
                (
                    Some("Market analysis failed".to_string()),
                    expose.then(|| serde_json::Value::String(msg.clone())),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (
                    Some("Something went wrong".to_string()),
                    expose.then(|| serde_json::Value::String(msg.clone())),
                )
            }
            AppError::Identity(msg) => {
                tracing::error!(error = %msg, "Identity provider error");
                (
                    Some("Something went wrong".to_string()),
                    expose.then(|| serde_json::Value::String(msg.clone())),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    Some("Something went wrong".to_string()),
                    expose.then(|| serde_json::Value::String(format!("{:?}", err))),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: self.code(),
            message,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let AppError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter()
                    .map(|e| FieldError {
                        field: field.clone(),
                        message: e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", field)),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(details)
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let err = AppError::Validation(vec![FieldError {
            field: "email".to_string(),
            message: "Email must be valid".to_string(),
        }]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_unauthorized_has_error_field() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_upstream_failures_are_server_errors() {
        for err in [
            AppError::AiProvider("boom".to_string()),
            AppError::Storage("boom".to_string()),
            AppError::Identity("boom".to_string()),
            AppError::Internal(anyhow::anyhow!("boom")),
        ] {
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
