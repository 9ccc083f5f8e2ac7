use std::collections::HashSet;

use thiserror::Error;

use crate::model::{Question, QuestionId, TestId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestPaperError {
    #[error("test title cannot be empty")]
    EmptyTitle,

    #[error("test has no questions")]
    NoQuestions,

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),
}

/// A test definition as fetched for one student.
///
/// Read-only to the timed session; the declared duration is carried through
/// so the caller can decide which countdown length applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPaper {
    id: TestId,
    title: String,
    questions: Vec<Question>,
    declared_duration_minutes: Option<u32>,
}

impl TestPaper {
    /// # Errors
    ///
    /// Returns `TestPaperError` if the title is blank, there are no questions,
    /// or two questions share an id.
    pub fn new(
        id: TestId,
        title: impl Into<String>,
        questions: Vec<Question>,
        declared_duration_minutes: Option<u32>,
    ) -> Result<Self, TestPaperError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TestPaperError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(TestPaperError::NoQuestions);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(TestPaperError::DuplicateQuestion(question.id().clone()));
            }
        }

        Ok(Self {
            id,
            title,
            questions,
            declared_duration_minutes,
        })
    }

    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.question(id).is_some()
    }

    #[must_use]
    pub fn declared_duration_minutes(&self) -> Option<u32> {
        self.declared_duration_minutes
    }
}
