use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use exam_core::model::{
    AttemptSubmission, QuestionId, SessionId, SubmissionResult, SubmitTrigger, TestId,
};
use exam_core::{Clock, Delivery, SessionStatus, SubmitDecision, TickOutcome, TimedSession};

use super::view::SessionView;
use crate::api::SubmissionSink;
use crate::error::AssessmentError;

/// Coarse lifecycle published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    NotStarted,
    InProgress,
    Submitting,
    Delivered,
    DeliveryFailed,
}

impl RunnerPhase {
    fn of(session: &TimedSession) -> Self {
        match (session.status(), session.delivery()) {
            (SessionStatus::NotStarted, _) => RunnerPhase::NotStarted,
            (SessionStatus::InProgress, _) => RunnerPhase::InProgress,
            (SessionStatus::Submitted, Some(Delivery::Confirmed(_))) => RunnerPhase::Delivered,
            (SessionStatus::Submitted, Some(Delivery::Failed { .. })) => {
                RunnerPhase::DeliveryFailed
            }
            (SessionStatus::Submitted, _) => RunnerPhase::Submitting,
        }
    }

    /// True once nothing more will happen without user action.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, RunnerPhase::Delivered | RunnerPhase::DeliveryFailed)
    }
}

/// Result of one tick as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    Idle,
    Running { remaining_secs: u64 },
    /// The timer finalized the session and the attempt was delivered.
    Expired(SubmissionResult),
}

/// Result of a submit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReport {
    Delivered {
        result: SubmissionResult,
        auto_submitted: bool,
    },
    /// Another trigger already owns finalization.
    Suppressed,
}

/// Drives one `TimedSession` against a submission sink.
///
/// The session sits behind an async mutex that is never held across the
/// network call; the finalize-once latch is the session's own state.
pub struct AssessmentRunner {
    session_id: SessionId,
    test_id: TestId,
    clock: Clock,
    sink: Arc<dyn SubmissionSink>,
    session: Mutex<TimedSession>,
    phase_tx: watch::Sender<RunnerPhase>,
}

impl AssessmentRunner {
    #[must_use]
    pub fn new(session: TimedSession, clock: Clock, sink: Arc<dyn SubmissionSink>) -> Self {
        let (phase_tx, _rx) = watch::channel(RunnerPhase::of(&session));
        Self {
            session_id: session.id(),
            test_id: session.paper().id().clone(),
            clock,
            sink,
            session: Mutex::new(session),
            phase_tx,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn test_id(&self) -> &TestId {
        &self.test_id
    }

    /// Observe lifecycle changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RunnerPhase> {
        self.phase_tx.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> RunnerPhase {
        *self.phase_tx.borrow()
    }

    fn publish(&self, session: &TimedSession) {
        self.phase_tx.send_replace(RunnerPhase::of(session));
    }

    /// Render the current state.
    pub async fn snapshot(&self) -> SessionView {
        let session = self.session.lock().await;
        SessionView::from_session(&session, self.clock.now())
    }

    /// Run `f` with read access to the session.
    pub async fn with_session<R>(&self, f: impl FnOnce(&TimedSession) -> R) -> R {
        let session = self.session.lock().await;
        f(&session)
    }

    /// # Errors
    ///
    /// Returns `AssessmentError::Session` if the session was already started.
    pub async fn start(&self) -> Result<(), AssessmentError> {
        let mut session = self.session.lock().await;
        session.start(self.clock.now())?;
        info!(
            session_id = %self.session_id,
            test_id = %self.test_id,
            duration_secs = session.duration_secs(),
            "test started"
        );
        self.publish(&session);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AssessmentError::Session` when answers are no longer accepted
    /// or the question is not on the paper.
    pub async fn record_answer(
        &self,
        question_id: QuestionId,
        option: impl Into<String>,
    ) -> Result<(), AssessmentError> {
        let mut session = self.session.lock().await;
        session.record_answer(question_id, option, self.clock.now())?;
        Ok(())
    }

    /// Advance the countdown; on expiry, deliver the timer's submission.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::SubmitFailure` if the auto-submission could
    /// not be delivered. The answers are kept for a manual retry.
    pub async fn tick(&self) -> Result<TickReport, AssessmentError> {
        let outcome = {
            let mut session = self.session.lock().await;
            let outcome = session.tick(self.clock.now());
            if matches!(outcome, TickOutcome::Expired(_)) {
                self.publish(&session);
            }
            outcome
        };

        match outcome {
            TickOutcome::Idle => Ok(TickReport::Idle),
            TickOutcome::Running { remaining_secs } => {
                debug!(session_id = %self.session_id, remaining_secs, "tick");
                Ok(TickReport::Running { remaining_secs })
            }
            TickOutcome::Expired(submission) => {
                info!(session_id = %self.session_id, "time is up, auto-submitting");
                match self.deliver(submission).await? {
                    SubmitReport::Delivered { result, .. } => Ok(TickReport::Expired(result)),
                    SubmitReport::Suppressed => Ok(TickReport::Idle),
                }
            }
        }
    }

    /// Submit on the student's behalf.
    ///
    /// After a failed delivery this re-sends the same frozen answers.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Session` before the test is started and
    /// `AssessmentError::SubmitFailure` if delivery fails.
    pub async fn submit(&self) -> Result<SubmitReport, AssessmentError> {
        let decision = {
            let mut session = self.session.lock().await;
            let decision = session.submit(SubmitTrigger::Manual, self.clock.now())?;
            self.publish(&session);
            decision
        };

        match decision {
            SubmitDecision::Send(submission) => self.deliver(submission).await,
            SubmitDecision::Suppressed => {
                debug!(session_id = %self.session_id, "submit suppressed");
                Ok(SubmitReport::Suppressed)
            }
        }
    }

    /// Retry a failed delivery. Same as [`Self::submit`].
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn retry_submit(&self) -> Result<SubmitReport, AssessmentError> {
        self.submit().await
    }

    async fn deliver(&self, submission: AttemptSubmission) -> Result<SubmitReport, AssessmentError> {
        let auto_submitted = submission.trigger.is_auto();
        info!(
            session_id = %self.session_id,
            test_id = %submission.test_id,
            trigger = submission.trigger.as_str(),
            answered = submission.answered_count(),
            total = submission.answers.len(),
            time_taken_secs = submission.time_taken_secs,
            "submitting attempt"
        );

        let outcome = self.sink.submit_attempt(&submission).await;

        let mut session = self.session.lock().await;
        let report = match outcome {
            Ok(result) => {
                session.mark_delivered(result.clone())?;
                info!(
                    session_id = %self.session_id,
                    percentage = result.percentage,
                    "attempt accepted"
                );
                Ok(SubmitReport::Delivered {
                    result,
                    auto_submitted,
                })
            }
            Err(err) => {
                let reason = err.to_string();
                session.mark_failed(reason.clone())?;
                warn!(session_id = %self.session_id, %reason, auto_submitted, "submission failed");
                Err(AssessmentError::SubmitFailure {
                    reason,
                    auto_submitted,
                })
            }
        };
        self.publish(&session);
        report
    }
}

impl fmt::Debug for AssessmentRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentRunner")
            .field("session_id", &self.session_id)
            .field("test_id", &self.test_id)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
