//! Timed assessment session.
//!
//! `NotStarted -> InProgress -> Submitted`, with no way back. The session
//! owns the countdown and the answer set, and latches the single transition
//! into `Submitted` so that a timer expiry racing a manual submit produces
//! exactly one outgoing payload.
//!
//! Time never passes on its own here: every operation takes `now`, and the
//! countdown only moves when the owner calls [`TimedSession::tick`].

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::{
    AnswerSet, AttemptSubmission, QuestionId, SessionId, StudentId, SubmissionResult,
    SubmitTrigger, TestPaper,
};
use crate::time::whole_seconds_between;

/// Countdown length used when nothing else is configured.
pub const DEFAULT_DURATION_SECS: u64 = 300;

/// Longest countdown a session accepts (one week).
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session duration must be at least one second")]
    ZeroDuration,

    #[error("session duration of {secs}s exceeds the maximum of {MAX_DURATION_SECS}s")]
    DurationTooLong { secs: u64 },

    #[error("session has already been started")]
    AlreadyStarted,

    #[error("session has not been started")]
    NotStarted,

    #[error("session has already been submitted")]
    Closed,

    #[error("time is up; answers can no longer be changed")]
    DeadlinePassed,

    #[error("question {0} is not part of this test")]
    UnknownQuestion(QuestionId),

    #[error("no submission is awaiting a response")]
    NoSubmissionInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Submitted,
}

/// Delivery sub-state of a `Submitted` session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The payload has been handed out and no response has been recorded yet.
    Pending,
    /// The last delivery attempt failed; the payload is kept for a manual retry.
    Failed { reason: String },
    /// The grading collaborator accepted the attempt.
    Confirmed(SubmissionResult),
}

/// Result of advancing the countdown by one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not running; nothing happened.
    Idle,
    Running { remaining_secs: u64 },
    /// The countdown hit zero and the session was finalized by the timer.
    /// The payload must be delivered by the caller.
    Expired(AttemptSubmission),
}

/// Whether a submit call won the latch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Deliver this payload.
    Send(AttemptSubmission),
    /// Another submit already owns finalization; do nothing.
    Suppressed,
}

#[derive(Debug, Clone)]
struct Finalized {
    submission: AttemptSubmission,
    delivery: Delivery,
    sends: u32,
}

/// One student's attempt at one test.
pub struct TimedSession {
    id: SessionId,
    paper: TestPaper,
    student_id: StudentId,
    duration_secs: u64,
    status: SessionStatus,
    started_at: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    remaining_secs: u64,
    answers: AnswerSet,
    finalized: Option<Finalized>,
}

impl TimedSession {
    /// Create a session in `NotStarted` for the given paper.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ZeroDuration` if `duration_secs` is zero and
    /// `SessionError::DurationTooLong` above `MAX_DURATION_SECS`.
    pub fn new(
        paper: TestPaper,
        student_id: StudentId,
        duration_secs: u64,
    ) -> Result<Self, SessionError> {
        if duration_secs == 0 {
            return Err(SessionError::ZeroDuration);
        }
        if duration_secs > MAX_DURATION_SECS {
            return Err(SessionError::DurationTooLong {
                secs: duration_secs,
            });
        }

        Ok(Self {
            id: SessionId::random(),
            paper,
            student_id,
            duration_secs,
            status: SessionStatus::NotStarted,
            started_at: None,
            deadline: None,
            remaining_secs: duration_secs,
            answers: AnswerSet::new(),
            finalized: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn paper(&self) -> &TestPaper {
        &self.paper
    }

    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    /// The frozen payload, once the session has been submitted.
    #[must_use]
    pub fn submission(&self) -> Option<&AttemptSubmission> {
        self.finalized.as_ref().map(|f| &f.submission)
    }

    #[must_use]
    pub fn delivery(&self) -> Option<&Delivery> {
        self.finalized.as_ref().map(|f| &f.delivery)
    }

    /// How many times the payload has been handed out for delivery.
    #[must_use]
    pub fn send_count(&self) -> u32 {
        self.finalized.as_ref().map_or(0, |f| f.sends)
    }

    /// True while answers may still be changed at `now`.
    #[must_use]
    pub fn accepts_answers(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::InProgress && self.deadline.is_some_and(|d| now < d)
    }

    /// Begin the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` unless the session is `NotStarted`,
    /// and `SessionError::DurationTooLong` if the deadline is not representable.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }

        let too_long = SessionError::DurationTooLong {
            secs: self.duration_secs,
        };
        let deadline = i64::try_from(self.duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|duration| now.checked_add_signed(duration))
            .ok_or(too_long)?;

        self.started_at = Some(now);
        self.deadline = Some(deadline);
        self.remaining_secs = self.duration_secs;
        self.status = SessionStatus::InProgress;
        Ok(())
    }

    /// Record (or overwrite) the selected option for a question.
    ///
    /// The option text is not checked against the question's options.
    ///
    /// # Errors
    ///
    /// Returns `NotStarted`/`Closed` outside `InProgress`, `DeadlinePassed`
    /// once `now` reaches the deadline, and `UnknownQuestion` for ids that
    /// are not on the paper.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        option: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::NotStarted => return Err(SessionError::NotStarted),
            SessionStatus::Submitted => return Err(SessionError::Closed),
            SessionStatus::InProgress => {}
        }
        if !self.accepts_answers(now) {
            return Err(SessionError::DeadlinePassed);
        }
        if !self.paper.contains(&question_id) {
            return Err(SessionError::UnknownQuestion(question_id));
        }

        self.answers.record(question_id, option);
        Ok(())
    }

    /// Advance the countdown by one tick.
    ///
    /// Remaining time never exceeds the time left until the deadline, so a
    /// scheduler that skips ticks cannot extend the test. On reaching zero
    /// the session is finalized with `SubmitTrigger::Timer`; later ticks
    /// are `Idle`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.status != SessionStatus::InProgress {
            return TickOutcome::Idle;
        }

        let until_deadline = self.deadline.map_or(0, |d| seconds_until(d, now));
        self.remaining_secs = self.remaining_secs.saturating_sub(1).min(until_deadline);

        if self.remaining_secs > 0 {
            return TickOutcome::Running {
                remaining_secs: self.remaining_secs,
            };
        }

        TickOutcome::Expired(self.finalize(SubmitTrigger::Timer, now))
    }

    /// Request finalization.
    ///
    /// The first call from `InProgress` wins and returns the payload. Any
    /// later call is `Suppressed`, except a manual submit after a failed
    /// delivery, which hands out the same frozen payload again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` before `start`.
    pub fn submit(
        &mut self,
        trigger: SubmitTrigger,
        now: DateTime<Utc>,
    ) -> Result<SubmitDecision, SessionError> {
        match self.status {
            SessionStatus::NotStarted => Err(SessionError::NotStarted),
            SessionStatus::InProgress => Ok(SubmitDecision::Send(self.finalize(trigger, now))),
            SessionStatus::Submitted => {
                let Some(finalized) = self.finalized.as_mut() else {
                    return Ok(SubmitDecision::Suppressed);
                };
                let is_retry = trigger == SubmitTrigger::Manual
                    && matches!(finalized.delivery, Delivery::Failed { .. });
                if !is_retry {
                    return Ok(SubmitDecision::Suppressed);
                }
                finalized.delivery = Delivery::Pending;
                finalized.sends = finalized.sends.saturating_add(1);
                Ok(SubmitDecision::Send(finalized.submission.clone()))
            }
        }
    }

    /// Record that the pending delivery succeeded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSubmissionInFlight` unless a delivery is pending.
    pub fn mark_delivered(&mut self, result: SubmissionResult) -> Result<(), SessionError> {
        let finalized = self.pending_mut()?;
        finalized.delivery = Delivery::Confirmed(result);
        Ok(())
    }

    /// Record that the pending delivery failed. The payload is kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSubmissionInFlight` unless a delivery is pending.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        let finalized = self.pending_mut()?;
        finalized.delivery = Delivery::Failed {
            reason: reason.into(),
        };
        Ok(())
    }

    fn pending_mut(&mut self) -> Result<&mut Finalized, SessionError> {
        match self.finalized.as_mut() {
            Some(finalized) if finalized.delivery == Delivery::Pending => Ok(finalized),
            _ => Err(SessionError::NoSubmissionInFlight),
        }
    }

    fn finalize(&mut self, trigger: SubmitTrigger, now: DateTime<Utc>) -> AttemptSubmission {
        let started_at = self.started_at.unwrap_or(now);
        let submission = AttemptSubmission {
            test_id: self.paper.id().clone(),
            student_id: self.student_id.clone(),
            answers: self.answers.to_submitted(&self.paper),
            started_at,
            completed_at: now,
            time_taken_secs: whole_seconds_between(started_at, now),
            trigger,
        };

        self.status = SessionStatus::Submitted;
        self.remaining_secs = match trigger {
            SubmitTrigger::Timer => 0,
            SubmitTrigger::Manual => self
                .deadline
                .map_or(0, |d| seconds_until(d, now))
                .min(self.remaining_secs),
        };
        self.finalized = Some(Finalized {
            submission: submission.clone(),
            delivery: Delivery::Pending,
            sends: 1,
        });
        submission
    }
}

/// Seconds left until `deadline`, rounded up so a partial second still counts.
fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    u64::try_from(millis).map_or(u64::MAX, |ms| ms.div_ceil(1000))
}

impl fmt::Debug for TimedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedSession")
            .field("id", &self.id)
            .field("test_id", self.paper.id())
            .field("status", &self.status)
            .field("remaining_secs", &self.remaining_secs)
            .field("answered", &self.answers.answered_count())
            .field("delivery", &self.delivery())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
