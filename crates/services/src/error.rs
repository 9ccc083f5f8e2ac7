//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::SessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the REST adapter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("HTTP error! status: {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("{0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// True for failures that may succeed if the same request is sent again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(_) => true,
            ApiError::HttpStatus(status) => status.is_server_error(),
            _ => false,
        }
    }
}

/// Errors emitted by `IdentityService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("the signed-in user is not a student")]
    NotStudent,
    #[error("the signed-in user is not a teacher")]
    NotTeacher,
    #[error("{0}")]
    InvalidRegistration(&'static str),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the assessment runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssessmentError {
    /// The test definition could not be fetched; no session was created.
    #[error("failed to load test: {0}")]
    LoadFailure(#[source] ApiError),
    /// Delivery failed; the answers are kept and a manual retry is possible.
    #[error("failed to submit test: {reason}")]
    SubmitFailure { reason: String, auto_submitted: bool },
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AssessmentError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AssessmentError::LoadFailure(_) | AssessmentError::SubmitFailure { .. }
        )
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
