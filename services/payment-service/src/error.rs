use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// Struktur response error yang konsisten untuk semua endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// Semua jenis error yang mungkin terjadi di payment service
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    UnauthorizedError(String),

    #[error("Forbidden: {0}")]
    ForbiddenError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Refund error: {0}")]
    RefundError(String),

    // Ledger order tidak konsisten dengan payment yang tercatat
    #[error("Ledger integrity error: {0}")]
    IntegrityError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("Serialization failed: {}", err))
    }
}

// Body JSON yang rusak atau salah tipe dijadikan validation error (400)
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Terjadi kesalahan pada database".to_string(),
                    cfg!(debug_assertions).then(|| e.to_string()),
                )
            }
            AppError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone(), None)
            }
            AppError::UnauthorizedError(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone(), None)
            }
            AppError::ForbiddenError(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::RefundError(msg) => {
                tracing::warn!("Refund rejected: {}", msg);
                (StatusCode::BAD_REQUEST, "refund_error", msg.clone(), None)
            }
            AppError::IntegrityError(msg) => {
                tracing::error!("Ledger integrity error: {}", msg);
                (StatusCode::CONFLICT, "ledger_conflict", msg.clone(), None)
            }
            AppError::TokenError(msg) => (
                StatusCode::UNAUTHORIZED,
                "token_error",
                "Token tidak valid atau sudah kadaluarsa".to_string(),
                cfg!(debug_assertions).then(|| msg.clone()),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                "Terlalu banyak permintaan. Silakan coba lagi nanti.".to_string(),
                None,
            ),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Terjadi kesalahan internal server".to_string(),
                    cfg!(debug_assertions).then(|| msg.clone()),
                )
            }
        };

        let error_response = ErrorResponse {
            success: false,
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

// Helper functions untuk membuat error dengan mudah
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFoundError(msg.into())
    }

    pub fn refund(msg: impl Into<String>) -> Self {
        AppError::RefundError(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        AppError::IntegrityError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::InternalError(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::UnauthorizedError(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::ForbiddenError(msg.into())
    }

    pub fn token(msg: impl Into<String>) -> Self {
        AppError::TokenError(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ValidationError(_) | AppError::RefundError(_) => StatusCode::BAD_REQUEST,
            AppError::UnauthorizedError(_) | AppError::TokenError(_) => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenError(_) => StatusCode::FORBIDDEN,
            AppError::NotFoundError(_) => StatusCode::NOT_FOUND,
            AppError::IntegrityError(_) => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

// Type alias untuk Result dengan AppError sebagai error type
pub type AppResult<T> = Result<T, AppError>;
