//! Error types for the link store and the public link operations

use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Field name used for destination URL validation messages
pub const FIELD_URL: &str = "url";

/// Field name used for short code validation messages
pub const FIELD_SLUG: &str = "slug";

/// Field name used when the request body itself cannot be read
pub const FIELD_BODY: &str = "body";

/// Validation messages keyed by input field
pub type FieldErrors = BTreeMap<String, String>;

/// Errors raised by [`crate::store::LinkStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The short code is already mapped to another link.
    #[error("short code already in use: {0}")]
    CodeConflict(String),

    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    /// A stored record could not be encoded or decoded.
    #[error("corrupt link record: {0}")]
    Serialization(#[from] serde_json::Error),
}

macro_rules! impl_from_redb {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for StoreError {
                fn from(err: $err) -> Self {
                    StoreError::Database(redb::Error::from(err))
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Failure outcomes of create, edit, delete and the owner read paths
///
/// Storage details never appear in the rendered message. Ownership
/// mismatches are reported as [`LinkError::NotFound`] so that callers
/// cannot discover links belonging to other users.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Please fix the highlighted fields")]
    Validation(FieldErrors),

    #[error("You must be signed in to manage links")]
    Unauthorized,

    #[error("Link not found")]
    NotFound,

    #[error("This short code is already taken. Please choose another.")]
    CodeTaken,

    #[error("Could not generate a unique short code. Please try again.")]
    AllocationExhausted,

    #[error("Something went wrong. Please try again later.")]
    OperationFailed,
}

impl LinkError {
    /// Validation failure for a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        LinkError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LinkError::Validation(_) => StatusCode::BAD_REQUEST,
            LinkError::Unauthorized => StatusCode::UNAUTHORIZED,
            LinkError::NotFound => StatusCode::NOT_FOUND,
            LinkError::CodeTaken => StatusCode::CONFLICT,
            LinkError::AllocationExhausted => StatusCode::SERVICE_UNAVAILABLE,
            LinkError::OperationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for LinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CodeConflict(_) => LinkError::CodeTaken,
            other => {
                error!(error = ?other, "link store operation failed");
                LinkError::OperationFailed
            }
        }
    }
}

impl From<JsonRejection> for LinkError {
    fn from(rejection: JsonRejection) -> Self {
        LinkError::field(FIELD_BODY, rejection.body_text())
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            LinkError::Validation(fields) => json!({
                "success": false,
                "error": self.to_string(),
                "field_errors": fields,
            }),
            _ => json!({
                "success": false,
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
