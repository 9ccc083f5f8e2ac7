//! Boundary to the remote exam API.
//!
//! Everything past this module sees only canonical domain types; alternate
//! field spellings in responses are resolved in `wire`.

mod client;
mod teacher;
mod wire;

use std::env;

use async_trait::async_trait;
use url::Url;

use exam_core::model::{
    AttemptId, AttemptSubmission, Identity, Role, StudentId, SubmissionResult, TestId, TestPaper,
};

use crate::error::ApiError;

pub use client::ApiClient;
pub use teacher::{
    AnswerReview, Difficulty, DraftQuestion, ParseDifficultyError, SUBMISSIONS_PER_PAGE,
    SubmissionDetail, SubmissionPage, SubmissionSummary, TeacherCatalog, TestBlueprint,
};

/// Backend address used when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url.trim())?;
        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_owned(),
        })
    }

    /// Reads `EXAM_API_BASE_URL`, falling back to the default address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the variable is set to garbage.
    pub fn from_env() -> Result<Self, ApiError> {
        let raw = env::var("EXAM_API_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
        Self::new(&raw)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn endpoint_with_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Url, ApiError> {
        Ok(Url::parse_with_params(&self.endpoint(path), query)?)
    }
}

/// REST paths, as served by the backend.
pub mod endpoints {
    use exam_core::model::{AttemptId, StudentId, TestId};

    pub const LOGIN: &str = "/api/auth/login";
    pub const STUDENT_LOGIN: &str = "/api/auth/student/login";
    pub const TEACHER_REGISTER: &str = "/api/auth/teacher/register";
    pub const SUBMIT_TEST: &str = "/api/student/submit-test";
    pub const GENERATE_MCQS: &str = "/api/mcq/generate";
    pub const SAVE_MCQS: &str = "/api/mcq/save";
    pub const TEST_SUBMISSIONS: &str = "/api/test/submissions";

    #[must_use]
    pub fn test_submission_detail(attempt_id: &AttemptId) -> String {
        format!("/api/test/submissions/{attempt_id}")
    }

    #[must_use]
    pub fn student_tests(student_id: &StudentId) -> String {
        format!("/api/student/{student_id}/tests")
    }

    #[must_use]
    pub fn student_test(student_id: &StudentId, test_id: &TestId) -> String {
        format!("/api/student/{student_id}/test/{test_id}")
    }

    #[must_use]
    pub fn student_results(student_id: &StudentId) -> String {
        format!("/api/student/{student_id}/results")
    }
}

/// A test visible to a student, as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestListing {
    pub id: TestId,
    pub title: String,
    pub question_count: Option<u32>,
    pub duration_minutes: Option<u32>,
}

/// A past graded attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultListing {
    pub attempt_id: Option<AttemptId>,
    pub test_title: String,
    pub result: SubmissionResult,
    pub time_taken_secs: Option<u64>,
}

/// Supplies test definitions.
#[async_trait]
pub trait TestSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` if the test cannot be fetched or is unusable.
    async fn fetch_test(
        &self,
        test_id: &TestId,
        student_id: &StudentId,
    ) -> Result<TestPaper, ApiError>;
}

/// Accepts finalized attempts for grading.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` if the attempt was not accepted.
    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionResult, ApiError>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` for bad credentials.
    async fn login(&self, email: &str, password: &str, role: Role) -> Result<Identity, ApiError>;

    /// Quick sign-in (registering on first use) for students.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend refuses the request.
    async fn student_login(&self, name: &str, email: &str) -> Result<Identity, ApiError>;

    /// Create a teacher account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the email is already registered.
    async fn register_teacher(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, ApiError>;
}

#[async_trait]
pub trait TestCatalog: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` on request or decoding failure.
    async fn list_tests(&self, student_id: &StudentId) -> Result<Vec<TestListing>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on request or decoding failure.
    async fn list_results(&self, student_id: &StudentId) -> Result<Vec<ResultListing>, ApiError>;
}
