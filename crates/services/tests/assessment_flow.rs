use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use exam_core::SessionError;
use exam_core::model::{
    AttemptSubmission, Question, QuestionId, StudentId, SubmissionResult, SubmitTrigger, TestId,
    TestPaper,
};
use exam_core::time::fixed_now;
use services::demo::{LocalGrader, demo_paper};
use services::{
    ApiError, AssessmentConfig, AssessmentError, AssessmentService, Clock, DurationPolicy,
    RunnerPhase, SubmissionSink, SubmitReport, TestSource, TickReport,
};

fn paper() -> TestPaper {
    let questions = ["q1", "q2", "q3"]
        .into_iter()
        .map(|id| {
            Question::new(
                QuestionId::new(id),
                format!("Prompt {id}"),
                vec!["A".into(), "B".into(), "C".into()],
                Some("A".into()),
            )
            .unwrap()
        })
        .collect();
    TestPaper::new(TestId::new("t1"), "Unit Quiz", questions, Some(10)).unwrap()
}

fn graded() -> SubmissionResult {
    SubmissionResult {
        attempt_id: None,
        correct_answers: 2,
        total_questions: 3,
        percentage: 67,
    }
}

struct StaticSource(TestPaper);

#[async_trait]
impl TestSource for StaticSource {
    async fn fetch_test(&self, _: &TestId, _: &StudentId) -> Result<TestPaper, ApiError> {
        Ok(self.0.clone())
    }
}

struct OfflineSource;

#[async_trait]
impl TestSource for OfflineSource {
    async fn fetch_test(&self, _: &TestId, _: &StudentId) -> Result<TestPaper, ApiError> {
        Err(ApiError::Rejected("Test not found".into()))
    }
}

/// Records payloads and fails the first `failures` calls.
#[derive(Default)]
struct RecordingSink {
    failures: AtomicUsize,
    received: Mutex<Vec<AttemptSubmission>>,
}

impl RecordingSink {
    fn failing(times: usize) -> Self {
        Self {
            failures: AtomicUsize::new(times),
            received: Mutex::new(Vec::new()),
        }
    }

    fn received(&self) -> Vec<AttemptSubmission> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionResult, ApiError> {
        self.received.lock().unwrap().push(submission.clone());
        let should_fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ApiError::Rejected("network unreachable".into()));
        }
        Ok(graded())
    }
}

/// Holds every call open until released.
#[derive(Default)]
struct GateSink {
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl SubmissionSink for GateSink {
    async fn submit_attempt(&self, _: &AttemptSubmission) -> Result<SubmissionResult, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(graded())
    }
}

fn service(sink: Arc<dyn SubmissionSink>, secs: u64) -> AssessmentService {
    AssessmentService::new(
        Clock::fixed(fixed_now()),
        Arc::new(StaticSource(paper())),
        sink,
    )
    .with_config(AssessmentConfig {
        duration: DurationPolicy::Fixed { secs },
        tick_period: Duration::from_secs(1),
    })
}

#[tokio::test]
async fn load_failure_creates_no_session() {
    let svc = AssessmentService::new(
        Clock::fixed(fixed_now()),
        Arc::new(OfflineSource),
        Arc::new(RecordingSink::default()),
    );

    let err = svc
        .load(&TestId::new("missing"), StudentId::new("s1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::LoadFailure(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn per_test_policy_uses_declared_minutes() {
    let svc = AssessmentService::new(
        Clock::fixed(fixed_now()),
        Arc::new(StaticSource(paper())),
        Arc::new(RecordingSink::default()),
    )
    .with_config(AssessmentConfig {
        duration: DurationPolicy::PerTest { fallback_secs: 300 },
        tick_period: Duration::from_secs(1),
    });

    let runner = svc
        .load(&TestId::new("t1"), StudentId::new("s1"))
        .await
        .unwrap();
    let secs = runner.with_session(|s| s.duration_secs()).await;
    assert_eq!(secs, 600);
}

#[tokio::test]
async fn submit_before_start_is_rejected() {
    let sink = Arc::new(RecordingSink::default());
    let runner = service(sink.clone(), 300)
        .load(&TestId::new("t1"), StudentId::new("s1"))
        .await
        .unwrap();

    let err = runner.submit().await.unwrap_err();
    assert!(matches!(
        err,
        AssessmentError::Session(SessionError::NotStarted)
    ));
    assert!(sink.received().is_empty());
}

#[tokio::test]
async fn manual_submit_sends_latest_answers_once() {
    let sink = Arc::new(RecordingSink::default());
    let runner = service(sink.clone(), 300)
        .load(&TestId::new("t1"), StudentId::new("s1"))
        .await
        .unwrap();

    runner.start().await.unwrap();
    runner.record_answer(QuestionId::new("q1"), "A").await.unwrap();
    runner.record_answer(QuestionId::new("q1"), "B").await.unwrap();

    let report = runner.submit().await.unwrap();
    assert_eq!(
        report,
        SubmitReport::Delivered {
            result: graded(),
            auto_submitted: false,
        }
    );
    assert_eq!(runner.phase(), RunnerPhase::Delivered);

    assert_eq!(runner.tick().await.unwrap(), TickReport::Idle);
    assert_eq!(runner.submit().await.unwrap(), SubmitReport::Suppressed);

    let received = sink.received();
    assert_eq!(received.len(), 1);
    let answers = &received[0].answers;
    assert_eq!(answers.len(), 3);
    assert_eq!(answers[0].selected_option.as_deref(), Some("B"));
    assert_eq!(answers[1].selected_option, None);
    assert_eq!(received[0].trigger, SubmitTrigger::Manual);
}

#[tokio::test]
async fn racing_triggers_send_exactly_once() {
    let gate = Arc::new(GateSink::default());
    let runner = service(gate.clone(), 1)
        .load(&TestId::new("t1"), StudentId::new("s1"))
        .await
        .unwrap();
    runner.start().await.unwrap();
    runner.record_answer(QuestionId::new("q2"), "C").await.unwrap();

    let in_flight = tokio::spawn({
        let runner = Arc::clone(&runner);
        async move { runner.submit().await }
    });
    gate.entered.notified().await;

    assert_eq!(runner.phase(), RunnerPhase::Submitting);
    assert_eq!(runner.tick().await.unwrap(), TickReport::Idle);
    assert_eq!(runner.submit().await.unwrap(), SubmitReport::Suppressed);
    let err = runner
        .record_answer(QuestionId::new("q2"), "A")
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::Session(SessionError::Closed)));

    gate.release.notify_one();
    let report = in_flight.await.unwrap().unwrap();
    assert!(matches!(report, SubmitReport::Delivered { .. }));
    assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_submit_keeps_answers_for_retry() {
    let sink = Arc::new(RecordingSink::failing(1));
    let runner = service(sink.clone(), 300)
        .load(&TestId::new("t1"), StudentId::new("s1"))
        .await
        .unwrap();
    runner.start().await.unwrap();
    runner.record_answer(QuestionId::new("q3"), "A").await.unwrap();

    let err = runner.submit().await.unwrap_err();
    match &err {
        AssessmentError::SubmitFailure {
            reason,
            auto_submitted,
        } => {
            assert!(reason.contains("network unreachable"));
            assert!(!auto_submitted);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(runner.phase(), RunnerPhase::DeliveryFailed);

    let view = runner.snapshot().await;
    assert!(view.can_retry);
    assert!(!view.input_enabled);
    assert!(runner.record_answer(QuestionId::new("q3"), "B").await.is_err());

    let report = runner.retry_submit().await.unwrap();
    assert!(matches!(report, SubmitReport::Delivered { .. }));

    let received = sink.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], received[1]);
    assert_eq!(runner.with_session(|s| s.send_count()).await, 2);
}

#[tokio::test]
async fn timer_expiry_auto_submits_and_can_be_retried() {
    let sink = Arc::new(RecordingSink::failing(1));
    let runner = service(sink.clone(), 2)
        .load(&TestId::new("t1"), StudentId::new("s1"))
        .await
        .unwrap();
    runner.start().await.unwrap();

    assert_eq!(
        runner.tick().await.unwrap(),
        TickReport::Running { remaining_secs: 1 }
    );
    let err = runner.tick().await.unwrap_err();
    assert!(matches!(
        err,
        AssessmentError::SubmitFailure {
            auto_submitted: true,
            ..
        }
    ));
    assert_eq!(runner.tick().await.unwrap(), TickReport::Idle);
    assert_eq!(sink.received().len(), 1);

    let report = runner.retry_submit().await.unwrap();
    assert_eq!(
        report,
        SubmitReport::Delivered {
            result: graded(),
            auto_submitted: true,
        }
    );
    assert!(
        sink.received()
            .iter()
            .all(|s| s.trigger == SubmitTrigger::Timer)
    );
}

#[tokio::test(start_paused = true)]
async fn ticker_auto_submits_at_deadline() {
    let sink = Arc::new(RecordingSink::default());
    let svc = service(sink.clone(), 3);
    let runner = svc
        .load(&TestId::new("t1"), StudentId::new("s1"))
        .await
        .unwrap();
    runner.start().await.unwrap();
    runner.record_answer(QuestionId::new("q1"), "A").await.unwrap();

    let mut phases = runner.subscribe();
    let ticker = svc.spawn_ticker(&runner);

    phases.wait_for(|phase| phase.is_settled()).await.unwrap();
    ticker.join().await;

    assert_eq!(runner.phase(), RunnerPhase::Delivered);
    let received = sink.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].trigger, SubmitTrigger::Timer);
    assert_eq!(received[0].answers[0].selected_option.as_deref(), Some("A"));
}

#[tokio::test(start_paused = true)]
async fn ticker_stops_after_manual_submit() {
    let sink = Arc::new(RecordingSink::default());
    let svc = service(sink.clone(), 300);
    let runner = svc
        .load(&TestId::new("t1"), StudentId::new("s1"))
        .await
        .unwrap();
    runner.start().await.unwrap();
    let ticker = svc.spawn_ticker(&runner);

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert_eq!(runner.snapshot().await.remaining_secs, 295);

    runner.submit().await.unwrap();
    ticker.join().await;
    assert_eq!(sink.received().len(), 1);
}

#[tokio::test]
async fn demo_paper_is_graded_locally() {
    let paper = demo_paper();
    let svc = AssessmentService::new(
        Clock::fixed(fixed_now()),
        Arc::new(StaticSource(paper.clone())),
        Arc::new(LocalGrader::new(paper.clone())),
    );
    let runner = svc.begin(paper.clone(), StudentId::new("s1")).unwrap();
    runner.start().await.unwrap();

    for question in paper.questions() {
        let key = question.correct_option().unwrap().to_owned();
        runner
            .record_answer(question.id().clone(), key)
            .await
            .unwrap();
    }

    match runner.submit().await.unwrap() {
        SubmitReport::Delivered { result, .. } => {
            assert_eq!(result.correct_answers, 5);
            assert_eq!(result.percentage, 100);
        }
        SubmitReport::Suppressed => panic!("submit suppressed"),
    }
}
