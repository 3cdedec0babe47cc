//! Error types and Axum response conversions.

use crate::auth::challenge::ChallengeError;
use crate::storage::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message shared by the "challenge not found" and "challenge expired" cases.
pub const NONCE_REJECTED: &str = "Nonce expired or not found";

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication required")]
    Unauthenticated,
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "field": field }),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication required" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(format!("Credential store error: {}", err))
    }
}

impl From<ChallengeError> for AppError {
    fn from(err: ChallengeError) -> Self {
        match err {
            ChallengeError::Malformed => {
                AppError::validation("message", "Nonce not found in message")
            }
            ChallengeError::NotFound | ChallengeError::Expired => {
                AppError::Unauthorized(NONCE_REJECTED.to_string())
            }
            ChallengeError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    /// Extract status code and JSON body from an AppError response.
    async fn error_response(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_internal_hides_details() {
        // CRITICAL: Internal error must NOT leak detailed message to client
        let (status, body) = error_response(AppError::Internal(
            "Redis connection refused at 10.0.0.5:6379".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body["error"].as_str().unwrap().contains("Redis"));
        assert!(!body["error"].as_str().unwrap().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_validation_names_field() {
        let (status, body) =
            error_response(AppError::validation("address", "Address is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Address is required");
        assert_eq!(body["field"], "address");
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let (status, body) =
            error_response(AppError::Unauthorized("Invalid signature".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid signature");
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let (status, body) = error_response(AppError::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }

    #[tokio::test]
    async fn test_not_found_and_expired_are_indistinguishable() {
        let (status_a, body_a) = error_response(ChallengeError::NotFound.into()).await;
        let (status_b, body_b) = error_response(ChallengeError::Expired.into()).await;
        assert_eq!(status_a, StatusCode::UNAUTHORIZED);
        assert_eq!(status_a, status_b);
        assert_eq!(body_a, body_b);
        assert_eq!(body_a["error"], NONCE_REJECTED);
    }

    #[tokio::test]
    async fn test_malformed_challenge_is_validation() {
        let (status, body) = error_response(ChallengeError::Malformed.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "message");
    }

    #[test]
    fn test_from_store_error() {
        let redis_err = redis::RedisError::from((
            redis::ErrorKind::IoError,
            "test context",
            "connection refused".to_string(),
        ));
        let app_err = AppError::from(StoreError::from(redis_err));
        match app_err {
            AppError::Internal(msg) => assert!(msg.contains("Redis error")),
            _ => panic!("Expected Internal variant"),
        }
    }

    #[test]
    fn test_challenge_store_error_is_internal() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let app_err = AppError::from(ChallengeError::Store(StoreError::from(serde_err)));
        assert!(matches!(app_err, AppError::Internal(_)));
    }
}
