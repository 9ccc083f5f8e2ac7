use std::collections::HashMap;

use crate::model::{QuestionId, TestPaper};

/// The student's current selections, keyed by question id.
///
/// Options are stored verbatim; nothing checks them against the question's
/// listed options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    selections: HashMap<QuestionId, String>,
}

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a selection, replacing any earlier one for the same question.
    pub fn record(&mut self, question_id: QuestionId, option: impl Into<String>) {
        self.selections.insert(question_id, option.into());
    }

    #[must_use]
    pub fn selected(&self, question_id: &QuestionId) -> Option<&str> {
        self.selections.get(question_id).map(String::as_str)
    }

    #[must_use]
    pub fn is_answered(&self, question_id: &QuestionId) -> bool {
        self.selections.contains_key(question_id)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.selections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// One entry per question on the paper, in paper order.
    ///
    /// Unanswered questions are kept with `selected_option: None`.
    #[must_use]
    pub fn to_submitted(&self, paper: &TestPaper) -> Vec<SubmittedAnswer> {
        paper
            .questions()
            .iter()
            .map(|question| SubmittedAnswer {
                question_id: question.id().clone(),
                selected_option: self.selections.get(question.id()).cloned(),
            })
            .collect()
    }
}

/// A single entry of the outgoing answer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_option: Option<String>,
}

impl SubmittedAnswer {
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.selected_option.is_some()
    }
}
