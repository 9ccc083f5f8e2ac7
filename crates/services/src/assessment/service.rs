use std::sync::Arc;

use tracing::{info, warn};

use exam_core::TimedSession;
use exam_core::model::{StudentId, TestId, TestPaper};

use super::config::AssessmentConfig;
use super::runner::AssessmentRunner;
use super::ticker::Ticker;
use crate::Clock;
use crate::api::{SubmissionSink, TestSource};
use crate::error::AssessmentError;

/// Loads tests and hands out runners for them.
#[derive(Clone)]
pub struct AssessmentService {
    clock: Clock,
    source: Arc<dyn TestSource>,
    sink: Arc<dyn SubmissionSink>,
    config: AssessmentConfig,
}

impl AssessmentService {
    #[must_use]
    pub fn new(clock: Clock, source: Arc<dyn TestSource>, sink: Arc<dyn SubmissionSink>) -> Self {
        Self {
            clock,
            source,
            sink,
            config: AssessmentConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: AssessmentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    /// Fetch a test and prepare an unstarted session for it.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::LoadFailure` if the test cannot be fetched;
    /// no session exists in that case.
    pub async fn load(
        &self,
        test_id: &TestId,
        student_id: StudentId,
    ) -> Result<Arc<AssessmentRunner>, AssessmentError> {
        let paper = self
            .source
            .fetch_test(test_id, &student_id)
            .await
            .map_err(|err| {
                warn!(%test_id, error = %err, "failed to load test");
                AssessmentError::LoadFailure(err)
            })?;
        self.begin(paper, student_id)
    }

    /// Prepare an unstarted session for an already loaded paper.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Session` if the configured duration is zero.
    pub fn begin(
        &self,
        paper: TestPaper,
        student_id: StudentId,
    ) -> Result<Arc<AssessmentRunner>, AssessmentError> {
        let duration_secs = self.config.duration.resolve(&paper);
        info!(
            test_id = %paper.id(),
            questions = paper.question_count(),
            duration_secs,
            "test loaded"
        );
        let session = TimedSession::new(paper, student_id, duration_secs)?;
        Ok(Arc::new(AssessmentRunner::new(
            session,
            self.clock,
            Arc::clone(&self.sink),
        )))
    }

    /// Drive `runner` at the configured tick period.
    #[must_use]
    pub fn spawn_ticker(&self, runner: &Arc<AssessmentRunner>) -> Ticker {
        Ticker::spawn(Arc::clone(runner), self.config.tick_period)
    }
}
