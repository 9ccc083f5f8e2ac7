use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use exam_core::model::{
    AttemptId, AttemptSubmission, Identity, Role, StudentId, SubmissionResult, TeacherId, TestId,
    TestPaper,
};

use super::wire::{
    self, GenerateQuestionsRequest, LoginRequest, SaveQuestionsRequest, StudentLoginRequest,
    SubmitTestRequest, TeacherRegisterRequest,
};
use super::{
    ApiConfig, Authenticator, DraftQuestion, ResultListing, SUBMISSIONS_PER_PAGE,
    SubmissionDetail, SubmissionPage, SubmissionSink, TeacherCatalog, TestBlueprint, TestCatalog,
    TestListing, TestSource, endpoints,
};
use crate::error::ApiError;

/// JSON client for the exam backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.config.endpoint(path);
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        read_body(response).await
    }

    async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let url = self.config.endpoint_with_query(path, query)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        read_body(response).await
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        let url = self.config.endpoint(path);
        debug!(%url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    decode_body(status, &bytes)
}

/// Decode the body and map HTTP or envelope failures to `ApiError`.
///
/// Error statuses prefer the server's own message over the bare status.
fn decode_body(status: StatusCode, bytes: &[u8]) -> Result<Value, ApiError> {
    let body: Value = serde_json::from_slice(bytes).unwrap_or(Value::Null);

    if !status.is_success() {
        warn!(%status, "api request failed");
        return Err(wire::error_message(&body)
            .map_or(ApiError::HttpStatus(status), ApiError::Rejected));
    }
    if body.is_null() {
        return Err(ApiError::Malformed("response body is not JSON".into()));
    }

    wire::check_envelope(&body)?;
    Ok(body)
}

#[async_trait]
impl TestSource for ApiClient {
    async fn fetch_test(
        &self,
        test_id: &TestId,
        student_id: &StudentId,
    ) -> Result<TestPaper, ApiError> {
        let body = self
            .get(&endpoints::student_test(student_id, test_id))
            .await?;
        wire::test_paper(&body)
    }
}

#[async_trait]
impl SubmissionSink for ApiClient {
    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionResult, ApiError> {
        let request = SubmitTestRequest::from_submission(submission);
        let body = self.post(endpoints::SUBMIT_TEST, &request).await?;
        wire::submission_result(&body)
    }
}

#[async_trait]
impl Authenticator for ApiClient {
    async fn login(&self, email: &str, password: &str, role: Role) -> Result<Identity, ApiError> {
        let request = LoginRequest {
            email,
            password,
            user_type: role,
        };
        let body = self.post(endpoints::LOGIN, &request).await?;
        wire::identity(&body, role)
    }

    async fn student_login(&self, name: &str, email: &str) -> Result<Identity, ApiError> {
        let request = StudentLoginRequest { name, email };
        let body = self.post(endpoints::STUDENT_LOGIN, &request).await?;
        wire::identity(&body, Role::Student)
    }

    async fn register_teacher(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, ApiError> {
        let request = TeacherRegisterRequest {
            name,
            email,
            password,
        };
        let body = self.post(endpoints::TEACHER_REGISTER, &request).await?;
        wire::identity(&body, Role::Teacher)
    }
}

#[async_trait]
impl TestCatalog for ApiClient {
    async fn list_tests(&self, student_id: &StudentId) -> Result<Vec<TestListing>, ApiError> {
        let body = self.get(&endpoints::student_tests(student_id)).await?;
        Ok(wire::test_listings(&body))
    }

    async fn list_results(&self, student_id: &StudentId) -> Result<Vec<ResultListing>, ApiError> {
        let body = self.get(&endpoints::student_results(student_id)).await?;
        Ok(wire::result_listings(&body))
    }
}

#[async_trait]
impl TeacherCatalog for ApiClient {
    async fn generate_questions(
        &self,
        teacher: &TeacherId,
        blueprint: &TestBlueprint,
    ) -> Result<Vec<DraftQuestion>, ApiError> {
        let request = GenerateQuestionsRequest::new(teacher, blueprint);
        let body = self.post(endpoints::GENERATE_MCQS, &request).await?;
        wire::draft_questions(&body)
    }

    async fn save_test(
        &self,
        teacher: &TeacherId,
        blueprint: &TestBlueprint,
        questions: &[DraftQuestion],
    ) -> Result<Option<TestId>, ApiError> {
        let request = SaveQuestionsRequest::new(teacher, blueprint, questions);
        let body = self.post(endpoints::SAVE_MCQS, &request).await?;
        Ok(wire::saved_test_id(&body))
    }

    async fn list_submissions(
        &self,
        teacher: &TeacherId,
        page: u32,
    ) -> Result<SubmissionPage, ApiError> {
        let page = page.max(1);
        let query = [
            ("teacherId", teacher.to_string()),
            ("page", page.to_string()),
            ("limit", SUBMISSIONS_PER_PAGE.to_string()),
        ];
        let body = self
            .get_with_query(endpoints::TEST_SUBMISSIONS, &query)
            .await?;
        Ok(wire::submission_page(&body, page))
    }

    async fn submission_detail(
        &self,
        attempt_id: &AttemptId,
    ) -> Result<SubmissionDetail, ApiError> {
        let body = self
            .get(&endpoints::test_submission_detail(attempt_id))
            .await?;
        wire::submission_detail(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_surfaces_server_message() {
        let err = decode_body(StatusCode::INTERNAL_SERVER_ERROR, br#"{"error":"database down"}"#)
            .unwrap_err();
        assert!(matches!(&err, ApiError::Rejected(message) if message == "database down"));
    }

    #[test]
    fn error_status_without_json_keeps_the_status() {
        let err = decode_body(StatusCode::BAD_GATEWAY, b"<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus(status) if status == StatusCode::BAD_GATEWAY));
        assert!(err.is_transient());

        let err = decode_body(StatusCode::NOT_FOUND, b"").unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus(status) if status == StatusCode::NOT_FOUND));
        assert!(!err.is_transient());
    }

    #[test]
    fn success_status_requires_json() {
        let err = decode_body(StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));

        let err = decode_body(StatusCode::OK, b"null").unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn success_status_with_failed_envelope_is_rejected() {
        let err = decode_body(StatusCode::OK, br#"{"success":false,"message":"Test closed"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Test closed");
    }

    #[test]
    fn success_body_is_returned() {
        let body = decode_body(StatusCode::OK, br#"{"success":true,"tests":[]}"#).unwrap();
        assert_eq!(body["success"], true);
    }
}
