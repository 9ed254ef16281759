//! API error types with IntoResponse
//!
//! Errors are converted to `{"error": message}` JSON with an HTTP status.
//! Store failures are logged in full and surfaced with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json};
use serde_json::json;
use tower::timeout::error::Elapsed;

use crate::models::ValidationError;
use crate::service::GuideError;

/// Client-facing message for slug conflicts
pub const DUPLICATE_TITLE_MESSAGE: &str = "A guide with this title already exists";

/// Client-facing message for unresolved ids/slugs
pub const NOT_FOUND_MESSAGE: &str = "Guide not found";

/// Client-facing message when a request outlives the timeout
pub const TIMEOUT_MESSAGE: &str = "Request timed out";

/// Client-facing message for middleware failures
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Which operation failed, for the generic 500 message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Get,
    Update,
    Delete,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::List => "Failed to fetch guides",
            Self::Create => "Failed to create guide",
            Self::Get => "Failed to fetch guide",
            Self::Update => "Failed to update guide",
            Self::Delete => "Failed to delete guide",
        }
    }
}

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Request body could not be parsed (400)
    BadRequest { message: String },

    /// Slug already in use (400)
    DuplicateSlug,

    /// Guide not found (404)
    NotFound,

    /// Store or other unexpected failure (500, logged)
    Internal { operation: Operation, detail: String },

    /// Request exceeded the configured timeout (500)
    Timeout,

    /// Failure raised by the middleware stack rather than a handler (500, logged)
    Middleware { detail: String },
}

impl ApiError {
    /// Map a service error raised while performing `operation`.
    pub fn during(operation: Operation) -> impl FnOnce(GuideError) -> Self {
        move |e| match e {
            GuideError::Validation(v) => Self::Validation(v),
            GuideError::DuplicateSlug(_) => Self::DuplicateSlug,
            GuideError::NotFound(_) => Self::NotFound,
            GuideError::Store(store) => Self::Internal {
                operation,
                detail: store.to_string(),
            },
        }
    }

    /// Error handler for the middleware stack (`HandleErrorLayer`).
    pub async fn from_middleware(err: BoxError) -> Self {
        if err.is::<Elapsed>() {
            Self::Timeout
        } else {
            Self::Middleware {
                detail: err.to_string(),
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } | Self::DuplicateSlug => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal { .. } | Self::Timeout | Self::Middleware { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Validation(e) => e.to_string(),
            Self::BadRequest { message } => message,
            Self::DuplicateSlug => DUPLICATE_TITLE_MESSAGE.to_string(),
            Self::NotFound => NOT_FOUND_MESSAGE.to_string(),
            Self::Internal { operation, detail } => {
                // Log the actual error, return generic message
                tracing::error!(?operation, "{}: {}", operation.failure_message(), detail);
                operation.failure_message().to_string()
            }
            Self::Timeout => {
                tracing::warn!("request timed out");
                TIMEOUT_MESSAGE.to_string()
            }
            Self::Middleware { detail } => {
                tracing::error!("middleware failure: {}", detail);
                INTERNAL_MESSAGE.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
