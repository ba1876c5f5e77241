//! Custom error types for the users service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::{repositories::RepositoryError, validation::FieldErrors};

static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Include raw internal error messages in 500 responses (development only)
pub fn expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

/// Custom error type for the users service
#[derive(Error, Debug)]
pub enum ApiError {
    /// One or more fields failed validation
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// A unique field collides with another record
    #[error("Duplicate value for {field}")]
    Duplicate {
        field: &'static str,
        message: String,
    },

    /// Path identifier is not a valid id
    #[error("Invalid user id")]
    InvalidId,

    /// No record with that id
    #[error("User not found")]
    NotFound,

    /// Request body could not be read as JSON
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// Query string could not be decoded
    #[error("Invalid query string: {0}")]
    InvalidQuery(#[from] QueryRejection),

    /// Client exceeded its request quota
    #[error("Too many requests")]
    TooManyRequests { retry_after_secs: u64 },

    /// Anything else
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Duplicate email with the message used when creating a record
    pub fn duplicate_email() -> Self {
        ApiError::Duplicate {
            field: "email",
            message: "Ya existe un usuario con este correo electrónico".to_string(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::Duplicate { .. }
            | ApiError::InvalidId => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidBody(rejection) => rejection.status(),
            ApiError::InvalidQuery(rejection) => rejection.status(),
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Validation(errors) => json!({
                "success": false,
                "message": "Errores de validación",
                "errors": errors,
            }),
            ApiError::Duplicate { field, message } => json!({
                "success": false,
                "message": message,
                "errors": { *field: message },
            }),
            ApiError::InvalidId => json!({
                "success": false,
                "message": "ID de usuario inválido",
            }),
            ApiError::NotFound => json!({
                "success": false,
                "message": "Usuario no encontrado",
            }),
            ApiError::InvalidBody(rejection) => json!({
                "success": false,
                "message": "Cuerpo de la solicitud inválido",
                "errors": { "body": rejection.body_text() },
            }),
            ApiError::InvalidQuery(rejection) => json!({
                "success": false,
                "message": "Parámetros de consulta inválidos",
                "errors": { "query": rejection.body_text() },
            }),
            ApiError::TooManyRequests { .. } => json!({
                "success": false,
                "message": "Demasiadas solicitudes desde esta IP, intente nuevamente más tarde.",
            }),
            ApiError::Internal(detail) => {
                let mut body = json!({
                    "success": false,
                    "message": "Error interno del servidor",
                });
                if EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
                    body["error"] = Value::String(detail.clone());
                }
                body
            }
        }
    }
}

/// Any path segment that cannot be decoded is reported as a bad id
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::InvalidId
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(errors) => ApiError::Validation(errors),
            RepositoryError::Duplicate { field } => ApiError::Duplicate {
                field,
                message: format!(
                    "Ya existe un usuario con ese {}",
                    if field == "email" {
                        "correo electrónico"
                    } else {
                        field
                    }
                ),
            },
            RepositoryError::Database(e) => ApiError::internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => tracing::error!("Unhandled error: {}", detail),
            other => tracing::warn!("Request rejected: {}", other),
        }

        let status = self.status();
        let body = Json(self.body());

        match self {
            ApiError::TooManyRequests { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serial_test::serial;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.insert("edad", "La edad debe estar entre 18 y 100 años".to_string());

        let (status, body) = render(ApiError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Errores de validación");
        assert_eq!(body["errors"]["edad"], "La edad debe estar entre 18 y 100 años");
    }

    #[tokio::test]
    async fn test_storage_duplicate_names_the_field() {
        let err = ApiError::from(RepositoryError::Duplicate { field: "email" });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Ya existe un usuario con ese correo electrónico"
        );
        assert!(body["errors"].get("email").is_some());
    }

    #[tokio::test]
    #[serial]
    async fn test_internal_detail_hidden_by_default() {
        expose_internal_errors(false);
        let (status, body) = render(ApiError::internal("connection reset")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error interno del servidor");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_internal_detail_shown_in_development() {
        expose_internal_errors(true);
        let (_, body) = render(ApiError::internal("connection reset")).await;
        expose_internal_errors(false);
        assert_eq!(body["error"], "connection reset");
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let response = ApiError::TooManyRequests {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
