//! Application error taxonomy
//!
//! Every error that leaves the repository/service layer is an [`AppError`]:
//! an immutable `(kind, message, cause)` triple produced once by
//! [`classify`] and passed upward unchanged. Driver errors never cross this
//! boundary.

mod classify;

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub use classify::{classify, sqlstate, FIELD_VALIDATION_MARKER};

pub type AppResult<T> = Result<T, AppError>;

/// Closed set of error kinds, one per HTTP status the API can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    RequestTimeout,
    Conflict,
    Gone,
    LengthRequired,
    TooManyRequests,
    InternalServerError,
    ServiceUnavailable,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Gone => StatusCode::GONE,
            Self::LengthRequired => StatusCode::LENGTH_REQUIRED,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Fixed message for this kind.
    pub fn message(&self) -> &'static str {
        match self {
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::MethodNotAllowed => "method not allowed",
            Self::NotAcceptable => "not acceptable",
            Self::RequestTimeout => "request timeout",
            Self::Conflict => "conflict",
            Self::Gone => "gone",
            Self::LengthRequired => "length required",
            Self::TooManyRequests => "too many requests",
            Self::InternalServerError => "internal server error",
            Self::ServiceUnavailable => "service unavailable",
        }
    }
}

/// Classified error crossing the core's boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    kind: ErrorKind,
    message: &'static str,
    cause: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            message: kind.message(),
            cause: cause.into(),
        }
    }

    /// Same status as `kind`, different fixed message.
    pub fn with_message(kind: ErrorKind, message: &'static str, cause: impl Into<String>) -> Self {
        Self {
            kind,
            message,
            cause: cause.into(),
        }
    }

    pub fn bad_request(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, cause)
    }

    /// 400 with the "bad query params" message.
    pub fn bad_query_params(cause: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::BadRequest, "bad query params", cause)
    }

    pub fn not_found(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, cause)
    }

    pub fn conflict(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, cause)
    }

    pub fn request_timeout(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestTimeout, cause)
    }

    pub fn internal(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServerError, cause)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status: {} - error_msg: {} - causes: {}",
            self.status().as_u16(),
            self.message,
            self.cause
        )
    }
}

impl std::error::Error for AppError {}

/// JSON error body
#[derive(Serialize)]
struct ErrorBody<'a> {
    err_status: u16,
    err_msg: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    err_cause: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side causes stay in the logs
        let cause = if status.is_server_error() {
            tracing::error!(kind = ?self.kind, cause = %self.cause, "request failed");
            "an internal error occurred"
        } else {
            tracing::debug!(kind = ?self.kind, cause = %self.cause, "request rejected");
            self.cause.as_str()
        };

        let body = ErrorBody {
            err_status: status.as_u16(),
            err_msg: self.message,
            err_cause: cause,
        };

        (status, Json(body)).into_response()
    }
}
