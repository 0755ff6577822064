//! Error types for the community service
//!
//! Every handler returns [`Result`]; errors are converted into JSON responses
//! with a `message` field that the web client displays as-is.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Result type for community-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    /// Rejected by the moderation gate; `reason` comes from the classifier.
    #[error("Content rejected: {reason}")]
    ContentRejected { reason: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::ContentRejected { .. } => "CONTENT_REJECTED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::ContentRejected { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let body = match self {
            AppError::Validation(errors) => json!({
                "message": "Invalid request",
                "code": self.code(),
                "errors": errors.field_errors(),
            }),
            AppError::ContentRejected { reason } => json!({
                "message": "Content violates community guidelines",
                "code": self.code(),
                "reason": reason,
            }),
            AppError::Database(e) => {
                tracing::error!(error = ?e, "Database error");
                json!({
                    "message": "Database error occurred",
                    "code": self.code(),
                })
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                json!({
                    "message": "Internal server error",
                    "code": self.code(),
                })
            }
            _ => json!({
                "message": self.to_string(),
                "code": self.code(),
            }),
        };

        HttpResponse::build(status).json(body)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ContentRejected { reason: "x".into() }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_rejection_body_carries_reason() {
        let resp = AppError::ContentRejected {
            reason: "profanity".into(),
        }
        .error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["code"], "CONTENT_REJECTED");
        assert_eq!(value["reason"], "profanity");
    }

    #[actix_web::test]
    async fn test_internal_error_hides_details() {
        let resp = AppError::Internal("secret stack trace".into()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(!text.contains("secret stack trace"));
    }
}
