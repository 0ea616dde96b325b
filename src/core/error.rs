use crate::dtos::{ApiError, ApiResponse, ResponseStatus};
use crate::repositories::{ErrorKind, RepositoryError};
use crate::services::jwt::TokenError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use tracing::error;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: &'static str,
    details: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            message,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    // Common error constructors
    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: &'static str) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal_server_error(message: &'static str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn service_unavailable(message: &'static str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    fn response_status(&self) -> ResponseStatus {
        match self.status {
            StatusCode::NOT_FOUND => ResponseStatus::NotFound,
            s if s.is_client_error() => ResponseStatus::InputError,
            _ => ResponseStatus::TransientError,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Resource not found"),

            sqlx::Error::Database(_) => Self::bad_request("Database error"),

            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::service_unavailable("Database unavailable")
            }

            _ => Self::internal_server_error("Internal server error"),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        let details = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::not_found("Resource not found").with_details(details),
            ErrorKind::Validation => Self::bad_request("Validation error").with_details(details),
            ErrorKind::Integrity => Self::conflict("Integrity violation"),
            ErrorKind::Configuration => {
                error!("Repository misconfigured: {}", details);
                Self::internal_server_error("Configuration error")
            }
            ErrorKind::Storage => match err {
                RepositoryError::Database(db) => Self::from(db),
                _ => Self::internal_server_error("Internal server error"),
            },
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::unauthorized("Token expired"),
            TokenError::Fetch(_) => Self::service_unavailable("Identity provider unavailable"),
            TokenError::Signing(_) | TokenError::Secret(_) => Self::internal_server_error("Internal server error"),
            other => Self::unauthorized("Unable to decode token").with_details(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::bad_request("Validation error").with_details(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body: ApiResponse<()> = ApiResponse::failure(
            self.response_status(),
            ApiError {
                code: self.status.as_u16(),
                message: self.message.to_string(),
                debug: self.details,
            },
        );
        (self.status, Json(body)).into_response()
    }
}
