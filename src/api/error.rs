//! Unified API error handling.
//!
//! All endpoints return errors in a single JSON envelope with a
//! machine-readable code and appropriate HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Identity / access
    Unauthorized,
    AuthExchangeError,
    InvalidProfileError,

    // Validation
    MissingField,
    BadFormat,
    NonPositiveRounds,
    MissingYear,

    // Resources
    NotFound,

    // Infrastructure
    UpstreamError,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::AuthExchangeError => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidProfileError => StatusCode::BAD_REQUEST,
            ErrorCode::MissingField => StatusCode::BAD_REQUEST,
            ErrorCode::BadFormat => StatusCode::BAD_REQUEST,
            ErrorCode::NonPositiveRounds => StatusCode::BAD_REQUEST,
            ErrorCode::MissingYear => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::AuthExchangeError => "auth_exchange_error",
            ErrorCode::InvalidProfileError => "invalid_profile_error",
            ErrorCode::MissingField => "missing_field",
            ErrorCode::BadFormat => "bad_format",
            ErrorCode::NonPositiveRounds => "non_positive_rounds",
            ErrorCode::MissingYear => "missing_year",
            ErrorCode::NotFound => "not_found",
            ErrorCode::UpstreamError => "upstream_error",
            ErrorCode::DatabaseError => "database_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// The inner error object in the response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// The offending field for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// The full error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    field: Option<String>,
}

impl ApiError {
    /// Create a new API error with a specific code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    /// Attach the offending field name
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    // -------------------------------------------------------------------------
    // Convenience constructors
    // -------------------------------------------------------------------------

    /// Unauthorized (401) - no or invalid identity binding
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "Authentication required")
    }

    /// Not found (404) - record absent or not owned by the caller
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// A mandatory field is missing or empty (400)
    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::MissingField, format!("Missing field: {field}")).with_field(field)
    }

    /// A field does not parse in its expected format (400)
    pub fn bad_format(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadFormat, message).with_field(field)
    }

    /// Rounds must be a positive integer (400)
    pub fn non_positive_rounds() -> Self {
        Self::new(
            ErrorCode::NonPositiveRounds,
            "Rounds must be greater than 0",
        )
        .with_field("rounds")
    }

    /// The summary endpoint requires a year (400)
    pub fn missing_year() -> Self {
        Self::new(ErrorCode::MissingYear, "year required").with_field("year")
    }

    /// Token exchange with the identity provider failed (400)
    pub fn auth_exchange(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthExchangeError, message)
    }

    /// The provider profile is unusable (400)
    pub fn invalid_profile(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidProfileError, message)
    }

    /// An outbound collaborator failed (502)
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamError, message)
    }

    /// Database error (500)
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Internal server error (500)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let response = ErrorResponse {
            error: ErrorBody {
                code: self.code.as_str().to_string(),
                message: self.message,
                field: self.field,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);

        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Not found"),
            _ => ApiError::database("A database error occurred"),
        }
    }
}
