//! Request payloads and response normalization.
//!
//! The backend is inconsistent about field names (`title` vs `Title`,
//! `id` vs `test_id`, question ids that are sometimes missing). Responses
//! are read as loose JSON and folded into one canonical shape here.

use serde::Serialize;
use serde_json::{Map, Value};

use exam_core::model::{
    AttemptId, AttemptSubmission, Identity, Question, QuestionId, Role, SubmissionResult,
    TeacherId, TestId, TestPaper,
};

use super::{
    AnswerReview, DraftQuestion, ResultListing, SubmissionDetail, SubmissionPage,
    SubmissionSummary, TestBlueprint, TestListing,
};
use crate::error::ApiError;

// ─── Requests ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub user_type: Role,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentLoginRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherRegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateQuestionsRequest<'a> {
    topic: &'a str,
    difficulty: String,
    no_of_que: u32,
    test_title: &'a str,
    teacher_id: &'a str,
    class: &'a str,
}

impl<'a> GenerateQuestionsRequest<'a> {
    pub(crate) fn new(teacher: &'a TeacherId, blueprint: &'a TestBlueprint) -> Self {
        Self {
            topic: &blueprint.topic,
            difficulty: blueprint.difficulty.as_str().to_ascii_lowercase(),
            no_of_que: blueprint.question_count,
            test_title: &blueprint.title,
            teacher_id: teacher.as_str(),
            class: &blueprint.class_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveQuestionsRequest<'a> {
    mcqs: &'a [DraftQuestion],
    teacher_id: &'a str,
    test_title: &'a str,
    topic: &'a str,
    difficulty: &'static str,
    class_name: &'a str,
}

impl<'a> SaveQuestionsRequest<'a> {
    pub(crate) fn new(
        teacher: &'a TeacherId,
        blueprint: &'a TestBlueprint,
        questions: &'a [DraftQuestion],
    ) -> Self {
        Self {
            mcqs: questions,
            teacher_id: teacher.as_str(),
            test_title: &blueprint.title,
            topic: &blueprint.topic,
            difficulty: blueprint.difficulty.as_str(),
            class_name: &blueprint.class_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitTestRequest<'a> {
    test_id: &'a str,
    student_id: &'a str,
    answers: Vec<WireAnswer<'a>>,
    time_taken: u64,
    started_at: String,
    completed_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAnswer<'a> {
    question_id: &'a str,
    selected_answer: Option<&'a str>,
}

impl<'a> SubmitTestRequest<'a> {
    pub(crate) fn from_submission(submission: &'a AttemptSubmission) -> Self {
        Self {
            test_id: submission.test_id.as_str(),
            student_id: submission.student_id.as_str(),
            answers: submission
                .answers
                .iter()
                .map(|answer| WireAnswer {
                    question_id: answer.question_id.as_str(),
                    selected_answer: answer.selected_option.as_deref(),
                })
                .collect(),
            time_taken: submission.time_taken_secs,
            started_at: submission.started_at.to_rfc3339(),
            completed_at: submission.completed_at.to_rfc3339(),
        }
    }
}

// ─── Envelope ──────────────────────────────────────────────────────────────────

/// Fails with `ApiError::Rejected` when the body says `success: false`.
pub(crate) fn check_envelope(body: &Value) -> Result<(), ApiError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = error_message(body).unwrap_or_else(|| "request failed".to_owned());
        return Err(ApiError::Rejected(message));
    }
    Ok(())
}

pub(crate) fn error_message(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    field(obj, &["error", "message"])
        .and_then(Value::as_str)
        .map(str::to_owned)
}

// ─── Field helpers ─────────────────────────────────────────────────────────────

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|value| !value.is_null())
}

fn text(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    field(obj, names).and_then(scalar_to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Option text is compared byte for byte on submit, so it is never trimmed
/// and blank entries keep their slot.
fn option_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn count(obj: &Map<String, Value>, names: &[&str]) -> Option<u32> {
    let value = field(obj, names)?;
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    // rounded and range-checked above
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = raw.round().min(f64::from(u32::MAX)) as u32;
    Some(rounded)
}

fn object<'a>(body: &'a Value, key: &str) -> Result<&'a Map<String, Value>, ApiError> {
    body.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| ApiError::Malformed(format!("missing `{key}` object")))
}

fn array<'a>(body: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice)
}

// ─── Responses ─────────────────────────────────────────────────────────────────

const ID: &[&str] = &["id", "Id", "ID"];
const TEST_ID: &[&str] = &["id", "Id", "test_id", "testId"];
const TITLE: &[&str] = &["title", "Title", "name"];
const DURATION: &[&str] = &["duration", "Duration", "duration_minutes", "durationMinutes"];

/// Normalize the `test` object of a fetch-test response.
pub(crate) fn test_paper(body: &Value) -> Result<TestPaper, ApiError> {
    let raw = object(body, "test")?;

    let id = text(raw, TEST_ID).ok_or_else(|| ApiError::Malformed("test has no id".into()))?;
    let title = text(raw, TITLE).unwrap_or_else(|| "Untitled test".to_owned());

    let raw_questions = raw
        .get("questions")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);
    let questions = raw_questions
        .iter()
        .enumerate()
        .map(|(index, value)| question(index, value))
        .collect::<Result<Vec<_>, _>>()?;

    TestPaper::new(TestId::new(id), title, questions, count(raw, DURATION))
        .map_err(|err| ApiError::Malformed(err.to_string()))
}

fn question(index: usize, value: &Value) -> Result<Question, ApiError> {
    let raw = value
        .as_object()
        .ok_or_else(|| ApiError::Malformed(format!("question {index} is not an object")))?;

    // missing ids fall back to the position on the paper
    let id = text(raw, ID).unwrap_or_else(|| index.to_string());
    let prompt = text(raw, &["question", "Question", "prompt", "text"]).unwrap_or_default();
    let options = raw
        .get("options")
        .and_then(Value::as_array)
        .map(|values| values.iter().map(option_text).collect())
        .unwrap_or_default();
    let correct = field(raw, &["correctAnswer", "correct_answer", "answer"]).map(option_text);

    Question::new(QuestionId::new(id), prompt, options, correct)
        .map_err(|err| ApiError::Malformed(err.to_string()))
}

/// Normalize the `result` object of a submit response.
pub(crate) fn submission_result(body: &Value) -> Result<SubmissionResult, ApiError> {
    let raw = object(body, "result")?;
    result_fields(raw)
}

fn result_fields(raw: &Map<String, Value>) -> Result<SubmissionResult, ApiError> {
    let correct_answers = count(raw, &["correctAnswers", "correct_answers", "score"])
        .ok_or_else(|| ApiError::Malformed("result has no correct answer count".into()))?;
    let total_questions = count(raw, &["totalQuestions", "total_questions"])
        .ok_or_else(|| ApiError::Malformed("result has no question count".into()))?;
    let percentage = count(raw, &["percentage", "percent"])
        .unwrap_or_else(|| SubmissionResult::percentage_of(correct_answers, total_questions));

    Ok(SubmissionResult {
        attempt_id: text(raw, &["attemptId", "attempt_id", "id"]).map(AttemptId::new),
        correct_answers,
        total_questions,
        percentage,
    })
}

/// Normalize the `user` (or, on registration, `teacher`) object of a login response.
pub(crate) fn identity(body: &Value, role: Role) -> Result<Identity, ApiError> {
    let raw = object(body, "user").or_else(|_| object(body, "teacher"))?;
    let user_id = text(raw, ID).ok_or_else(|| ApiError::Malformed("user has no id".into()))?;

    Ok(Identity {
        user_id,
        name: text(raw, &["name", "Name", "full_name"]).unwrap_or_default(),
        email: text(raw, &["email", "Email"]).unwrap_or_default(),
        role,
    })
}

pub(crate) fn test_listings(body: &Value) -> Vec<TestListing> {
    array(body, &["tests", "data"])
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|raw| {
            let id = text(raw, TEST_ID)?;
            let question_count = raw
                .get("questions")
                .and_then(Value::as_array)
                .and_then(|qs| u32::try_from(qs.len()).ok())
                .or_else(|| count(raw, &["questions", "question_count", "questionCount"]));
            Some(TestListing {
                id: TestId::new(id),
                title: text(raw, TITLE).unwrap_or_else(|| "Untitled test".to_owned()),
                question_count,
                duration_minutes: count(raw, DURATION),
            })
        })
        .collect()
}

pub(crate) fn result_listings(body: &Value) -> Vec<ResultListing> {
    array(body, &["results", "attempts", "data"])
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|raw| {
            let result = result_fields(raw).ok()?;
            let test_title = text(raw, &["testTitle", "test_title", "title", "Title"])
                .or_else(|| {
                    raw.get("test")
                        .and_then(Value::as_object)
                        .and_then(|test| text(test, TITLE))
                })
                .unwrap_or_else(|| "Untitled test".to_owned());
            Some(ResultListing {
                attempt_id: result.attempt_id.clone(),
                test_title,
                result,
                time_taken_secs: field(raw, &["timeTaken", "time_taken"])
                    .and_then(Value::as_u64),
            })
        })
        .collect()
}

/// Normalize the drafts of a generate response, skipping unusable entries.
pub(crate) fn draft_questions(body: &Value) -> Result<Vec<DraftQuestion>, ApiError> {
    let drafts: Vec<DraftQuestion> = array(body, &["mcqs", "questions", "data"])
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|raw| {
            let question = text(raw, &["question", "Question", "prompt"])?;
            let options: Vec<String> = raw
                .get("options")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(option_text).collect())
                .unwrap_or_default();
            if options.is_empty() {
                return None;
            }
            let correct_answer =
                field(raw, &["correctAnswer", "correct_answer", "answer"]).map(option_text)?;
            Some(DraftQuestion {
                question,
                options,
                correct_answer,
                explanation: text(raw, &["explanation", "Explanation"]),
            })
        })
        .collect();

    if drafts.is_empty() {
        return Err(ApiError::Malformed("no questions were generated".into()));
    }
    Ok(drafts)
}

/// Id of a freshly saved test, when the backend reports one.
pub(crate) fn saved_test_id(body: &Value) -> Option<TestId> {
    body.get("test")
        .and_then(Value::as_object)
        .and_then(|test| text(test, TEST_ID))
        .or_else(|| body.as_object().and_then(|obj| text(obj, &["testId", "test_id"])))
        .map(TestId::new)
}

pub(crate) fn submission_page(body: &Value, page: u32) -> SubmissionPage {
    let submissions = array(body, &["submissions", "data"])
        .iter()
        .filter_map(Value::as_object)
        .filter_map(submission_summary)
        .collect();
    let total_pages = body
        .get("pagination")
        .and_then(Value::as_object)
        .and_then(|pagination| count(pagination, &["totalPages", "total_pages"]))
        .filter(|pages| *pages > 0)
        .unwrap_or(1);

    SubmissionPage {
        submissions,
        page,
        total_pages,
    }
}

/// Normalize the `submission` object of a detail response.
pub(crate) fn submission_detail(body: &Value) -> Result<SubmissionDetail, ApiError> {
    let raw = object(body, "submission")?;
    let summary = submission_summary(raw)
        .ok_or_else(|| ApiError::Malformed("submission has no id or score".into()))?;

    let class_name = nested_text(raw, "students", &["class"])
        .or_else(|| nested_text(raw, "tests", &["class"]));
    let answers = raw
        .get("answers")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
        .iter()
        .filter_map(Value::as_object)
        .map(answer_review)
        .collect();

    Ok(SubmissionDetail {
        summary,
        class_name,
        answers,
    })
}

fn nested_text(obj: &Map<String, Value>, key: &str, names: &[&str]) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_object)
        .and_then(|inner| text(inner, names))
}

// Here `score` is the percentage, unlike in student results.
fn submission_summary(raw: &Map<String, Value>) -> Option<SubmissionSummary> {
    let attempt_id = text(raw, &["id", "attempt_id", "attemptId"])?;
    let correct_answers = count(raw, &["correct_answers", "correctAnswers"])?;
    let total_questions = count(raw, &["total_questions", "totalQuestions"])?;
    let percentage = count(raw, &["score", "percentage"])
        .map(|p| p.min(100))
        .unwrap_or_else(|| SubmissionResult::percentage_of(correct_answers, total_questions));

    Some(SubmissionSummary {
        attempt_id: AttemptId::new(attempt_id.clone()),
        student_name: nested_text(raw, "students", &["full_name", "name"])
            .unwrap_or_else(|| "Unknown Student".to_owned()),
        student_email: nested_text(raw, "students", &["email"]).unwrap_or_default(),
        test_title: nested_text(raw, "tests", TITLE).unwrap_or_else(|| "Unknown Test".to_owned()),
        subject: nested_text(raw, "tests", &["subject", "topic"]),
        difficulty: nested_text(raw, "tests", &["difficulty"]),
        result: SubmissionResult {
            attempt_id: Some(AttemptId::new(attempt_id)),
            correct_answers,
            total_questions,
            percentage,
        },
        time_taken_secs: field(raw, &["time_taken", "timeTaken"]).and_then(Value::as_u64),
        completed_at: text(raw, &["completed_at", "completedAt"]),
    })
}

fn answer_review(raw: &Map<String, Value>) -> AnswerReview {
    let selected_answer = field(raw, &["selected_answer", "selectedAnswer"]).map(option_text);
    let correct_answer = field(raw, &["correct_answer", "correctAnswer"]).map(option_text);
    let is_correct = field(raw, &["is_correct", "isCorrect"])
        .and_then(Value::as_bool)
        .unwrap_or_else(|| selected_answer.is_some() && selected_answer == correct_answer);

    AnswerReview {
        selected_answer,
        correct_answer,
        is_correct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Difficulty;
    use exam_core::model::{StudentId, SubmitTrigger, SubmittedAnswer};
    use exam_core::time::fixed_now;
    use serde_json::json;

    #[test]
    fn reads_capitalized_title_and_missing_question_ids() {
        let body = json!({
            "success": true,
            "test": {
                "Id": 12,
                "Title": "Rust Basics",
                "duration": 30,
                "questions": [
                    { "question": "Which keyword binds?", "options": ["let", "var"] },
                    { "id": "q-b", "prompt": "Borrowing?", "options": ["&", "*"], "correct_answer": "&" }
                ]
            }
        });

        let paper = test_paper(&body).unwrap();
        assert_eq!(paper.id(), &TestId::new("12"));
        assert_eq!(paper.title(), "Rust Basics");
        assert_eq!(paper.declared_duration_minutes(), Some(30));
        assert_eq!(paper.questions()[0].id(), &QuestionId::new("0"));
        assert_eq!(paper.questions()[1].id(), &QuestionId::new("q-b"));
        assert_eq!(paper.questions()[1].correct_option(), Some("&"));
    }

    #[test]
    fn lower_case_title_wins_when_both_are_present() {
        let body = json!({
            "test": {
                "id": "t1",
                "title": "lower",
                "Title": "Upper",
                "questions": [{ "question": "Q", "options": ["a"] }]
            }
        });
        assert_eq!(test_paper(&body).unwrap().title(), "lower");
    }

    #[test]
    fn test_without_questions_is_malformed() {
        let body = json!({ "test": { "id": "t1", "title": "Empty", "questions": [] } });
        assert!(matches!(test_paper(&body), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn failed_envelope_surfaces_server_message() {
        let body = json!({ "success": false, "error": "Test not found" });
        let err = check_envelope(&body).unwrap_err();
        assert_eq!(err.to_string(), "Test not found");
    }

    #[test]
    fn result_percentage_is_computed_when_missing() {
        let body = json!({ "result": { "correctAnswers": 2, "totalQuestions": 3, "attemptId": "a1" } });
        let result = submission_result(&body).unwrap();
        assert_eq!(result.percentage, 67);
        assert_eq!(result.attempt_id, Some(AttemptId::new("a1")));
    }

    #[test]
    fn options_are_kept_verbatim_and_in_place() {
        let body = json!({
            "test": {
                "id": "t1",
                "title": "Spacing",
                "questions": [{
                    "id": "q1",
                    "question": "Pick one",
                    "options": [" Paris", "Lyon ", "", 42],
                    "correctAnswer": "Lyon "
                }]
            }
        });

        let paper = test_paper(&body).unwrap();
        let question = &paper.questions()[0];
        assert_eq!(question.options(), [" Paris", "Lyon ", "", "42"]);
        assert_eq!(question.option_for_label('B'), Some("Lyon "));
        assert_eq!(question.option_for_label('D'), Some("42"));
        assert_eq!(question.correct_option(), Some("Lyon "));
    }

    #[test]
    fn huge_counts_do_not_overflow_the_percentage() {
        let body = json!({ "result": { "correctAnswers": 4_000_000_000_u32, "totalQuestions": 3_000_000_000_u32 } });
        assert_eq!(submission_result(&body).unwrap().percentage, 100);

        let body = json!({ "result": { "correctAnswers": 2_000_000_000_u32, "totalQuestions": 4_000_000_000_u32 } });
        assert_eq!(submission_result(&body).unwrap().percentage, 50);
    }

    #[test]
    fn fractional_percentages_are_rounded() {
        let body = json!({ "result": { "correct_answers": 1, "total_questions": 3, "percentage": 33.33 } });
        assert_eq!(submission_result(&body).unwrap().percentage, 33);
    }

    #[test]
    fn submit_request_keeps_unanswered_as_null() {
        let submission = AttemptSubmission {
            test_id: TestId::new("t1"),
            student_id: StudentId::new("s1"),
            answers: vec![
                SubmittedAnswer {
                    question_id: QuestionId::new("q1"),
                    selected_option: Some("B".into()),
                },
                SubmittedAnswer {
                    question_id: QuestionId::new("q2"),
                    selected_option: None,
                },
            ],
            started_at: fixed_now(),
            completed_at: fixed_now() + chrono::Duration::seconds(75),
            time_taken_secs: 75,
            trigger: SubmitTrigger::Timer,
        };

        let value = serde_json::to_value(SubmitTestRequest::from_submission(&submission)).unwrap();
        assert_eq!(value["testId"], "t1");
        assert_eq!(value["studentId"], "s1");
        assert_eq!(value["timeTaken"], 75);
        assert_eq!(value["answers"][0]["selectedAnswer"], "B");
        assert!(value["answers"][1]["selectedAnswer"].is_null());
        assert_eq!(value["answers"][1]["questionId"], "q2");
    }

    #[test]
    fn login_request_uses_backend_names() {
        let value = serde_json::to_value(LoginRequest {
            email: "a@b.c",
            password: "pw",
            user_type: Role::Teacher,
        })
        .unwrap();
        assert_eq!(value["userType"], "teacher");
    }

    #[test]
    fn identity_requires_user_id() {
        let body = json!({ "success": true, "user": { "name": "No Id" } });
        assert!(matches!(
            identity(&body, Role::Student),
            Err(ApiError::Malformed(_))
        ));

        let body = json!({ "user": { "id": 7, "name": "Ada", "email": "ada@x.io" } });
        let who = identity(&body, Role::Student).unwrap();
        assert_eq!(who.user_id, "7");
        assert_eq!(who.role, Role::Student);
    }

    #[test]
    fn registration_reads_the_teacher_object() {
        let body = json!({ "success": true, "teacher": { "id": "t-9", "name": "Grace", "email": "g@x.io" } });
        let who = identity(&body, Role::Teacher).unwrap();
        assert_eq!(who.user_id, "t-9");
        assert_eq!(who.role, Role::Teacher);
    }

    fn blueprint() -> TestBlueprint {
        TestBlueprint {
            title: "Fractions".into(),
            topic: "Maths".into(),
            difficulty: Difficulty::Medium,
            question_count: 5,
            class_name: "7B".into(),
        }
    }

    #[test]
    fn generate_and_save_requests_use_backend_names() {
        let teacher = TeacherId::new("t-1");
        let blueprint = blueprint();

        let value = serde_json::to_value(GenerateQuestionsRequest::new(&teacher, &blueprint)).unwrap();
        assert_eq!(value["noOfQue"], 5);
        assert_eq!(value["difficulty"], "medium");
        assert_eq!(value["teacherId"], "t-1");
        assert_eq!(value["class"], "7B");

        let drafts = vec![DraftQuestion {
            question: "1/2 + 1/4?".into(),
            options: vec!["3/4".into(), "2/6".into()],
            correct_answer: "3/4".into(),
            explanation: Some("common denominator".into()),
        }];
        let value =
            serde_json::to_value(SaveQuestionsRequest::new(&teacher, &blueprint, &drafts)).unwrap();
        assert_eq!(value["difficulty"], "Medium");
        assert_eq!(value["className"], "7B");
        assert_eq!(value["testTitle"], "Fractions");
        assert_eq!(value["mcqs"][0]["correctAnswer"], "3/4");
    }

    #[test]
    fn drafts_skip_entries_without_options_or_key() {
        let body = json!({
            "success": true,
            "mcqs": [
                { "question": "Kept", "options": ["a", " b"], "correctAnswer": " b", "explanation": "why" },
                { "question": "No options", "options": [], "correctAnswer": "a" },
                { "question": "No key", "options": ["a"] }
            ]
        });
        let drafts = draft_questions(&body).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].options, ["a", " b"]);
        assert_eq!(drafts[0].correct_answer, " b");
        assert_eq!(drafts[0].explanation.as_deref(), Some("why"));

        let empty = json!({ "success": true, "mcqs": [] });
        assert!(matches!(draft_questions(&empty), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn saved_test_id_reads_either_shape() {
        assert_eq!(saved_test_id(&json!({ "test": { "id": 5 } })), Some(TestId::new("5")));
        assert_eq!(saved_test_id(&json!({ "testId": "t-2" })), Some(TestId::new("t-2")));
        assert_eq!(saved_test_id(&json!({ "success": true })), None);
    }

    #[test]
    fn submission_page_reads_nested_student_and_test() {
        let body = json!({
            "success": true,
            "submissions": [
                {
                    "id": "a1",
                    "students": { "full_name": "Ada", "email": "ada@x.io" },
                    "tests": { "title": "Fractions", "subject": "Maths", "difficulty": "Easy" },
                    "score": 80,
                    "correct_answers": 4,
                    "total_questions": 5,
                    "time_taken": 95,
                    "completed_at": "2024-03-01T10:00:00Z"
                },
                { "id": "a2", "correct_answers": 1, "total_questions": 4 },
                { "students": { "full_name": "No id" }, "correct_answers": 1, "total_questions": 1 }
            ],
            "pagination": { "totalPages": 3 }
        });

        let page = submission_page(&body, 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.submissions.len(), 2);

        let first = &page.submissions[0];
        assert_eq!(first.attempt_id, AttemptId::new("a1"));
        assert_eq!(first.student_name, "Ada");
        assert_eq!(first.test_title, "Fractions");
        assert_eq!(first.result.percentage, 80);
        assert_eq!(first.result.correct_answers, 4);
        assert_eq!(first.time_taken_secs, Some(95));

        let second = &page.submissions[1];
        assert_eq!(second.student_name, "Unknown Student");
        assert_eq!(second.result.percentage, 25);
        assert_eq!(second.time_taken_secs, None);
    }

    #[test]
    fn submission_page_defaults_to_one_page() {
        let page = submission_page(&json!({ "success": true }), 1);
        assert!(page.submissions.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn submission_detail_reviews_each_answer() {
        let body = json!({
            "success": true,
            "submission": {
                "id": "a1",
                "students": { "full_name": "Ada", "class": "7B" },
                "tests": { "title": "Fractions" },
                "score": 50,
                "correct_answers": 1,
                "total_questions": 2,
                "answers": [
                    { "selected_answer": "3/4", "correct_answer": "3/4", "is_correct": true },
                    { "selected_answer": "2/6", "correct_answer": "1/3" },
                    { "selected_answer": null, "correct_answer": "1" }
                ]
            }
        });

        let detail = submission_detail(&body).unwrap();
        assert_eq!(detail.class_name.as_deref(), Some("7B"));
        assert_eq!(detail.summary.result.percentage, 50);
        assert_eq!(detail.answers.len(), 3);
        assert!(detail.answers[0].is_correct);
        assert!(!detail.answers[1].is_correct);
        assert_eq!(detail.answers[2].selected_answer, None);
        assert!(!detail.answers[2].is_correct);

        let missing = json!({ "success": true, "submission": { "students": {} } });
        assert!(matches!(submission_detail(&missing), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn listings_skip_entries_without_ids() {
        let body = json!({
            "tests": [
                { "id": "t1", "Title": "One", "questions": [{}, {}], "duration": 10 },
                { "title": "No id" },
                { "test_id": "t3", "title": "Three", "question_count": 5 }
            ]
        });
        let listings = test_listings(&body);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].question_count, Some(2));
        assert_eq!(listings[0].duration_minutes, Some(10));
        assert_eq!(listings[1].id, TestId::new("t3"));
        assert_eq!(listings[1].question_count, Some(5));
    }

    #[test]
    fn result_listings_read_nested_test_titles() {
        let body = json!({
            "results": [
                { "id": "a1", "test": { "Title": "Nested" }, "score": 4, "total_questions": 5 },
                { "title": "broken" }
            ]
        });
        let listings = result_listings(&body);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].test_title, "Nested");
        assert_eq!(listings[0].result.percentage, 80);
        assert_eq!(listings[0].time_taken_secs, None);
    }

    #[test]
    fn result_listings_carry_time_taken() {
        let body = json!({
            "results": [
                { "attemptId": "a1", "testTitle": "Timed", "correctAnswers": 3, "totalQuestions": 4, "timeTaken": 125 }
            ]
        });
        let listings = result_listings(&body);
        assert_eq!(listings[0].time_taken_secs, Some(125));
        assert_eq!(listings[0].result.percentage, 75);
    }
}
