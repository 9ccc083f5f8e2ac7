use exam_core::model::{AttemptSubmission, ScoreBand, SubmissionResult};
use exam_core::time::format_countdown;

/// Summary shown after a test has been graded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsView {
    pub headline: &'static str,
    pub band: ScoreBand,
    pub correct: u32,
    pub incorrect: u32,
    pub total: u32,
    pub percentage: u32,
    pub auto_submitted: bool,
    pub time_taken_secs: Option<u64>,
}

impl ResultsView {
    #[must_use]
    pub fn new(result: &SubmissionResult, auto_submitted: bool) -> Self {
        let band = result.band();
        Self {
            headline: band.headline(),
            band,
            correct: result.correct_answers,
            incorrect: result.incorrect_answers(),
            total: result.total_questions,
            percentage: result.percentage,
            auto_submitted,
            time_taken_secs: None,
        }
    }

    /// View for the submission this session just delivered.
    #[must_use]
    pub fn for_submission(result: &SubmissionResult, submission: &AttemptSubmission) -> Self {
        Self::new(result, submission.trigger.is_auto())
            .with_time_taken(Some(submission.time_taken_secs))
    }

    #[must_use]
    pub fn with_time_taken(mut self, secs: Option<u64>) -> Self {
        self.time_taken_secs = secs;
        self
    }

    /// Elapsed time as `m:ss`, when known.
    #[must_use]
    pub fn time_taken(&self) -> Option<String> {
        self.time_taken_secs.map(format_countdown)
    }

    /// One-line score, e.g. `4/5 correct (80%)`.
    #[must_use]
    pub fn score_line(&self) -> String {
        format!("{}/{} correct ({}%)", self.correct, self.total, self.percentage)
    }

    #[must_use]
    pub fn note(&self) -> Option<&'static str> {
        self.auto_submitted
            .then_some("Time ran out; your answers were submitted automatically.")
    }
}
