//! Built-in practice paper, graded locally.
//!
//! Lets a student try the timed flow without a backend.

use async_trait::async_trait;

use exam_core::grading;
use exam_core::model::{
    AttemptSubmission, Question, QuestionId, SubmissionResult, TestId, TestPaper,
};

use crate::api::SubmissionSink;
use crate::error::ApiError;

pub const DEMO_TEST_ID: &str = "demo-1";

const DEMO_QUESTIONS: &[(&str, &[&str], &str)] = &[
    (
        "Which keyword declares an immutable binding in Rust?",
        &["let", "mut", "const fn", "static mut"],
        "let",
    ),
    (
        "Which method appends an element to the end of a Vec?",
        &["push", "append_one", "insert_last", "add"],
        "push",
    ),
    (
        "What does the `?` operator do on an `Err` value?",
        &[
            "Returns it early from the function",
            "Panics",
            "Ignores it",
            "Converts it to None",
        ],
        "Returns it early from the function",
    ),
    (
        "Which trait lets a type be printed with `{}`?",
        &["Display", "Debug", "ToString", "Format"],
        "Display",
    ),
    (
        "What is the size of `()` in bytes?",
        &["0", "1", "4", "8"],
        "0",
    ),
];

/// The practice paper, with its answer key.
///
/// # Panics
///
/// Panics if the embedded question table is invalid, which is a bug.
#[must_use]
pub fn demo_paper() -> TestPaper {
    let questions = DEMO_QUESTIONS
        .iter()
        .enumerate()
        .map(|(index, (prompt, options, key))| {
            Question::new(
                QuestionId::new((index + 1).to_string()),
                *prompt,
                options.iter().map(|o| (*o).to_owned()).collect(),
                Some((*key).to_owned()),
            )
            .expect("demo question table is valid")
        })
        .collect();

    TestPaper::new(TestId::new(DEMO_TEST_ID), "Rust Fundamentals Demo", questions, Some(5))
        .expect("demo paper is valid")
}

/// Grades submissions against a paper held in memory.
#[derive(Debug, Clone)]
pub struct LocalGrader {
    paper: TestPaper,
}

impl LocalGrader {
    #[must_use]
    pub fn new(paper: TestPaper) -> Self {
        Self { paper }
    }
}

#[async_trait]
impl SubmissionSink for LocalGrader {
    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionResult, ApiError> {
        if &submission.test_id != self.paper.id() {
            return Err(ApiError::Rejected(format!(
                "unknown test: {}",
                submission.test_id
            )));
        }
        Ok(grading::grade(&self.paper, &submission.answers))
    }
}
