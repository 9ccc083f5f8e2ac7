//! Local grading for practice papers that ship with their answer key.
//!
//! Real tests are graded by the remote API; this is only used for the
//! built-in demo paper.

use crate::model::{SubmissionResult, SubmittedAnswer, TestPaper};

/// Grade `answers` against the keys embedded in `paper`.
///
/// Questions without a key, and answers for questions not on the paper,
/// never count as correct.
#[must_use]
pub fn grade(paper: &TestPaper, answers: &[SubmittedAnswer]) -> SubmissionResult {
    let correct = answers
        .iter()
        .filter(|answer| {
            let Some(selected) = answer.selected_option.as_deref() else {
                return false;
            };
            paper
                .question(&answer.question_id)
                .and_then(|q| q.correct_option())
                .is_some_and(|key| key == selected)
        })
        .count();

    let total = paper.question_count();
    let correct_answers = u32::try_from(correct).unwrap_or(u32::MAX);
    let total_questions = u32::try_from(total).unwrap_or(u32::MAX);

    SubmissionResult {
        attempt_id: None,
        correct_answers,
        total_questions,
        percentage: SubmissionResult::percentage_of(correct_answers, total_questions),
    }
}
