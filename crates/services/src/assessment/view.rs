use chrono::{DateTime, Utc};

use exam_core::model::{QuestionId, SubmissionResult};
use exam_core::time::format_countdown;
use exam_core::{Delivery, SessionStatus, TimedSession};

/// Remaining time below which the countdown turns amber.
pub const WARNING_THRESHOLD_SECS: u64 = 120;
/// Remaining time below which the countdown turns red and a warning shows.
pub const DANGER_THRESHOLD_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Calm,
    Warning,
    Danger,
}

impl Urgency {
    #[must_use]
    pub fn for_remaining(remaining_secs: u64) -> Self {
        if remaining_secs > WARNING_THRESHOLD_SECS {
            Urgency::Calm
        } else if remaining_secs > DANGER_THRESHOLD_SECS {
            Urgency::Warning
        } else {
            Urgency::Danger
        }
    }
}

/// The one message to show above the questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    None,
    TimeRunningOut { remaining: String },
    Submitting { auto_submitted: bool },
    SubmitFailed { message: String, auto_submitted: bool },
    Submitted { result: SubmissionResult, auto_submitted: bool },
}

/// Snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub title: String,
    pub status: SessionStatus,
    pub remaining_secs: u64,
    pub countdown: String,
    pub urgency: Urgency,
    pub time_left_percent: u8,
    pub answered: usize,
    pub total: usize,
    pub unanswered: Vec<QuestionId>,
    pub input_enabled: bool,
    pub can_submit: bool,
    pub can_retry: bool,
    pub banner: Banner,
}

impl SessionView {
    #[must_use]
    pub fn from_session(session: &TimedSession, now: DateTime<Utc>) -> Self {
        let paper = session.paper();
        let answers = session.answers();
        let remaining_secs = session.remaining_secs();
        let auto_submitted = session.submission().is_some_and(|s| s.trigger.is_auto());

        let banner = match (session.status(), session.delivery()) {
            (SessionStatus::Submitted, Some(Delivery::Pending)) => {
                Banner::Submitting { auto_submitted }
            }
            (SessionStatus::Submitted, Some(Delivery::Failed { reason })) => Banner::SubmitFailed {
                message: failure_message(reason, auto_submitted),
                auto_submitted,
            },
            (SessionStatus::Submitted, Some(Delivery::Confirmed(result))) => Banner::Submitted {
                result: result.clone(),
                auto_submitted,
            },
            (SessionStatus::InProgress, _) if remaining_secs <= DANGER_THRESHOLD_SECS => {
                Banner::TimeRunningOut {
                    remaining: format_countdown(remaining_secs),
                }
            }
            _ => Banner::None,
        };

        let in_progress = session.status() == SessionStatus::InProgress;

        Self {
            title: paper.title().to_owned(),
            status: session.status(),
            remaining_secs,
            countdown: format_countdown(remaining_secs),
            urgency: Urgency::for_remaining(remaining_secs),
            time_left_percent: percent(remaining_secs, session.duration_secs()),
            answered: answers.answered_count(),
            total: paper.question_count(),
            unanswered: paper
                .questions()
                .iter()
                .filter(|q| !answers.is_answered(q.id()))
                .map(|q| q.id().clone())
                .collect(),
            input_enabled: session.accepts_answers(now),
            can_submit: in_progress,
            can_retry: matches!(session.delivery(), Some(Delivery::Failed { .. })),
            banner,
        }
    }
}

fn failure_message(reason: &str, auto_submitted: bool) -> String {
    if auto_submitted {
        format!(
            "Time is up and your answers could not be submitted ({reason}). \
             They are saved; retry once you are back online."
        )
    } else {
        format!("Failed to submit test ({reason}). Please try again.")
    }
}

fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    u8::try_from(part.min(whole) * 100 / whole).unwrap_or(100)
}
