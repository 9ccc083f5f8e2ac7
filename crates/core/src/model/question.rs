use thiserror::Error;

use crate::model::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question {0} has no options")]
    NoOptions(QuestionId),
}

/// A single multiple-choice question as served by the test source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_option: Option<String>,
}

impl Question {
    /// Build a question, validating its prompt and options.
    ///
    /// `correct_option` is only `Some` when the server chose to expose it.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` for a blank prompt and
    /// `QuestionError::NoOptions` when no options are given.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option: Option<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions(id));
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct_option,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// The answer key, if the server exposed it.
    #[must_use]
    pub fn correct_option(&self) -> Option<&str> {
        self.correct_option.as_deref()
    }

    /// Returns the option shown under the given letter (`A`, `B`, ...).
    #[must_use]
    pub fn option_for_label(&self, label: char) -> Option<&str> {
        let upper = label.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        let index = usize::from(upper as u8 - b'A');
        self.options.get(index).map(String::as_str)
    }
}

/// Display letter for the option at `index` (`0 -> 'A'`).
#[must_use]
pub fn option_label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .filter(u8::is_ascii_uppercase)
        .map_or('?', char::from)
}
