//! Two-stage error classifier
//!
//! Stage 1 sorts any error into a kind, preferring structured matches
//! (sentinel variants, concrete error types found by downcast). Database
//! errors are handed to stage 2, which dispatches on the SQLSTATE code.
//!
//! Matching on rendered error text is only the last resort, for errors whose
//! type this crate does not know. It is brittle across driver versions and
//! should not grow.

use std::error::Error as StdError;
use std::num::{ParseFloatError, ParseIntError};

use tokio::time::error::Elapsed;

use super::{AppError, ErrorKind};
use crate::db::DbError;
use crate::models::ValidationError;

/// Prefix carried by every validation failure's cause.
pub const FIELD_VALIDATION_MARKER: &str = "field validation error";

/// Last-resort text markers for object storage lookups that missed.
const STORAGE_NOT_FOUND_MARKERS: &[&str] = &[
    "bucket not found",
    "object not found",
    "NoSuchBucket",
    "NoSuchKey",
];

/// Last-resort text marker for database errors that lost their structure.
const SQLSTATE_MARKER: &str = "SQLSTATE";

/// Last-resort text marker for number parsing failures.
const SYNTAX_MARKER: &str = "invalid syntax";

/// SQLSTATE codes with a dedicated classification.
pub mod sqlstate {
    pub const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";
    pub const NOT_NULL_VIOLATION: &str = "23502";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const SERIALIZATION_FAILURE: &str = "40001";
    pub const SYNTAX_ERROR: &str = "42601";
}

/// Code -> (kind, cause prefix). Closed table.
const SQLSTATE_TABLE: &[(&str, ErrorKind, &str)] = &[
    (sqlstate::NUMERIC_VALUE_OUT_OF_RANGE, ErrorKind::BadRequest, "Numeric value out of range"),
    (sqlstate::UNIQUE_VIOLATION, ErrorKind::Conflict, "Unique constraint violation"),
    (sqlstate::FOREIGN_KEY_VIOLATION, ErrorKind::BadRequest, "Foreign key violation"),
    (sqlstate::NOT_NULL_VIOLATION, ErrorKind::BadRequest, "Not-null constraint violation"),
    (sqlstate::CHECK_VIOLATION, ErrorKind::BadRequest, "Check violation"),
    (sqlstate::SERIALIZATION_FAILURE, ErrorKind::Conflict, "Serialization error"),
    (sqlstate::SYNTAX_ERROR, ErrorKind::BadRequest, "Syntax error in SQL statement"),
];

/// Classify any error into the application taxonomy.
///
/// An [`AppError`] passes through unchanged, so classifying twice is
/// harmless.
pub fn classify(err: &(dyn StdError + 'static)) -> AppError {
    if let Some(app) = err.downcast_ref::<AppError>() {
        return app.clone();
    }
    if let Some(db) = err.downcast_ref::<DbError>() {
        return classify_db(db);
    }
    if let Some(sqlx) = err.downcast_ref::<sqlx::Error>() {
        return classify_sqlx(sqlx);
    }
    if err.is::<Elapsed>() {
        return AppError::request_timeout(err.to_string());
    }
    if err.is::<ParseIntError>() || err.is::<ParseFloatError>() {
        return AppError::bad_request(format!("{SYNTAX_MARKER}: {err}"));
    }
    if let Some(validation) = err.downcast_ref::<ValidationError>() {
        return AppError::bad_request(format!("{FIELD_VALIDATION_MARKER}: {validation}"));
    }

    // Wrapped errors: classify the cause, keep it if it says more than "internal"
    if let Some(source) = err.source() {
        let inner = classify(source);
        if inner.kind() != ErrorKind::InternalServerError {
            return inner;
        }
    }

    classify_message(&err.to_string())
}

fn classify_db(err: &DbError) -> AppError {
    match err {
        DbError::Sqlx(e) => classify_sqlx(e),
        DbError::TooManyRows => AppError::conflict(format!("too many rows: {err}")),
        DbError::DeadlineExceeded => AppError::request_timeout(err.to_string()),
        DbError::TransactionFinished => AppError::internal(err.to_string()),
    }
}

fn classify_sqlx(err: &sqlx::Error) -> AppError {
    match err {
        sqlx::Error::RowNotFound => AppError::not_found(format!("no records found: {err}")),
        sqlx::Error::PoolTimedOut => AppError::request_timeout(err.to_string()),
        sqlx::Error::Database(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => classify_sql(err),
        _ => classify_message(&err.to_string()),
    }
}

/// Stage 2: SQL-specific errors.
///
/// Known SQLSTATE codes map through [`SQLSTATE_TABLE`]. Anything else here
/// (unknown codes, errors without a code, row shape mismatches) is the
/// caller's statement or input being wrong, so it is a bad request carrying
/// the raw message.
fn classify_sql(err: &sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = err {
        if let Some(code) = db.code() {
            if let Some(app) = classify_code(&code, db.message()) {
                return app;
            }
        }
    }

    AppError::bad_request(err.to_string())
}

fn classify_code(code: &str, message: &str) -> Option<AppError> {
    SQLSTATE_TABLE
        .iter()
        .find(|(known, _, _)| *known == code)
        .map(|(_, kind, prefix)| AppError::new(*kind, format!("{prefix}: {message}")))
}

/// Fallback for errors known only by their text.
fn classify_message(message: &str) -> AppError {
    if STORAGE_NOT_FOUND_MARKERS.iter().any(|m| message.contains(m)) {
        return AppError::bad_request(message);
    }
    if message.contains(SQLSTATE_MARKER) {
        return AppError::bad_request(message);
    }
    if message.contains(SYNTAX_MARKER) {
        return AppError::bad_request(SYNTAX_MARKER);
    }
    if message.contains(FIELD_VALIDATION_MARKER) {
        return AppError::bad_request(message);
    }

    AppError::internal(message)
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        classify_db(&err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        classify_sqlx(&err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        classify(&err)
    }
}

impl From<ParseIntError> for AppError {
    fn from(err: ParseIntError) -> Self {
        classify(&err)
    }
}

impl From<Elapsed> for AppError {
    fn from(err: Elapsed) -> Self {
        classify(&err)
    }
}
