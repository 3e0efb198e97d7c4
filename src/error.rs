// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::schema::FieldError;

/// HTTP API error with appropriate status codes and client-safe messages.
///
/// Every variant except `Unauthorized` renders as the standard failure
/// envelope `{"success": false, "error": {"message", "details"}}`; auth
/// failures keep the flat `{"message"}` body existing clients depend on.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    Validation { message: String, details: Vec<FieldError> },

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    Internal(String),

    // 503 Service Unavailable
    Unavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-safe error message. Internals never flow through here; they
    /// are logged where the variant is built.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Validation { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::TooManyRequests(msg) => msg,
            ApiError::Internal(msg) => msg,
            ApiError::Unavailable(msg) => msg,
        }
    }

    /// JSON response body for this error.
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Unauthorized(message) => json!({ "message": message }),
            ApiError::Validation { message, details } => json!({
                "success": false,
                "error": { "message": message, "details": details }
            }),
            _ => json!({
                "success": false,
                "error": { "message": self.message(), "details": Value::Null }
            }),
        }
    }
}

// Static constructors
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        ApiError::Validation { message: message.into(), details }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::Unavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound => ApiError::not_found("Record not found"),
            DatabaseError::UniqueViolation { constraint, table, .. } => {
                tracing::debug!("unique violation on {:?} ({:?})", constraint, table);
                let message = match table.as_deref() {
                    Some("profiles") => "A profile with this email already exists",
                    Some("tags") => "A tag with this name already exists",
                    Some("document_tag_relation") => "Tag is already attached to this document",
                    _ => "Resource already exists",
                };
                ApiError::conflict(message)
            }
            DatabaseError::ForeignKeyViolation { constraint, .. } => {
                tracing::debug!("foreign key violation on {:?}", constraint);
                ApiError::not_found("Referenced record does not exist")
            }
            DatabaseError::CheckViolation { constraint, message, .. } => {
                tracing::debug!("check violation on {:?}: {}", constraint, message);
                ApiError::bad_request("Value rejected by a data constraint")
            }
            DatabaseError::Unavailable(msg) => {
                tracing::error!("database unavailable: {}", msg);
                ApiError::unavailable("Database temporarily unavailable")
            }
            DatabaseError::Query(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("database query error: {}", msg);
                ApiError::internal("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return a generic message
                tracing::error!("sqlx error: {}", sqlx_err);
                ApiError::internal("Database error occurred")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
