use chrono::{DateTime, Utc};

use crate::model::{AttemptId, StudentId, SubmittedAnswer, TestId};

/// What caused a session to be finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitTrigger {
    /// The student pressed submit.
    Manual,
    /// The countdown reached zero.
    Timer,
}

impl SubmitTrigger {
    #[must_use]
    pub fn is_auto(self) -> bool {
        matches!(self, SubmitTrigger::Timer)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitTrigger::Manual => "manual",
            SubmitTrigger::Timer => "timer",
        }
    }
}

/// Frozen payload produced by the winning submit.
///
/// Retries re-send this exact value; it is never rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSubmission {
    pub test_id: TestId,
    pub student_id: StudentId,
    pub answers: Vec<SubmittedAnswer>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub time_taken_secs: u64,
    pub trigger: SubmitTrigger,
}

impl AttemptSubmission {
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_answered()).count()
    }
}

/// Score returned by the grading collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub attempt_id: Option<AttemptId>,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub percentage: u32,
}

impl SubmissionResult {
    /// Whole percentage of `correct` out of `total`, rounded half up and
    /// capped at 100. Zero questions score zero.
    #[must_use]
    pub fn percentage_of(correct: u32, total: u32) -> u32 {
        if total == 0 {
            return 0;
        }
        let (correct, total) = (u64::from(correct), u64::from(total));
        let rounded = (correct * 200 + total) / (total * 2);
        u32::try_from(rounded.min(100)).unwrap_or(100)
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> u32 {
        self.total_questions.saturating_sub(self.correct_answers)
    }

    #[must_use]
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_percentage(self.percentage)
    }
}

/// Coarse performance bucket shown on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Great,
    Good,
    NeedsWork,
}

impl ScoreBand {
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => ScoreBand::Excellent,
            75..=89 => ScoreBand::Great,
            60..=74 => ScoreBand::Good,
            _ => ScoreBand::NeedsWork,
        }
    }

    #[must_use]
    pub fn headline(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent work!",
            ScoreBand::Great => "Great job!",
            ScoreBand::Good => "Good effort!",
            ScoreBand::NeedsWork => "Keep practicing!",
        }
    }
}
