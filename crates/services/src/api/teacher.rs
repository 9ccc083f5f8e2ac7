//! Teacher-side authoring and review.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use exam_core::model::{AttemptId, SubmissionResult, TeacherId, TestId};

use crate::error::ApiError;

/// Submissions shown per page on the review screen.
pub const SUBMISSIONS_PER_PAGE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDifficultyError(String);

impl fmt::Display for ParseDifficultyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown difficulty: {}", self.0)
    }
}

impl std::error::Error for ParseDifficultyError {}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ParseDifficultyError(other.to_owned())),
        }
    }
}

/// What a teacher asks the backend to draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBlueprint {
    pub title: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_count: u32,
    pub class_name: String,
}

/// A generated question awaiting the teacher's approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// One row of the submitted-tests table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSummary {
    pub attempt_id: AttemptId,
    pub student_name: String,
    pub student_email: String,
    pub test_title: String,
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub result: SubmissionResult,
    pub time_taken_secs: Option<u64>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPage {
    pub submissions: Vec<SubmissionSummary>,
    pub page: u32,
    pub total_pages: u32,
}

/// How one question was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerReview {
    pub selected_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDetail {
    pub summary: SubmissionSummary,
    pub class_name: Option<String>,
    pub answers: Vec<AnswerReview>,
}

#[async_trait]
pub trait TeacherCatalog: Send + Sync {
    /// Ask the backend to draft questions for `blueprint`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Malformed` when nothing usable comes back.
    async fn generate_questions(
        &self,
        teacher: &TeacherId,
        blueprint: &TestBlueprint,
    ) -> Result<Vec<DraftQuestion>, ApiError>;

    /// Publish the approved drafts as a test.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend refuses the test.
    async fn save_test(
        &self,
        teacher: &TeacherId,
        blueprint: &TestBlueprint,
        questions: &[DraftQuestion],
    ) -> Result<Option<TestId>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on request or decoding failure.
    async fn list_submissions(
        &self,
        teacher: &TeacherId,
        page: u32,
    ) -> Result<SubmissionPage, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Malformed` if the submission cannot be read.
    async fn submission_detail(&self, attempt_id: &AttemptId)
    -> Result<SubmissionDetail, ApiError>;
}
