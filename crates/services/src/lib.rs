#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod assessment;
pub mod demo;
pub mod error;
pub mod identity_service;
pub mod results;

pub use exam_core::Clock;

pub use api::{
    ApiClient, ApiConfig, Authenticator, SubmissionSink, TeacherCatalog, TestCatalog, TestSource,
};
pub use app_services::AppServices;
pub use assessment::{
    AssessmentConfig, AssessmentRunner, AssessmentService, DurationPolicy, RunnerPhase,
    SessionView, SubmitReport, TickReport, Ticker,
};
pub use error::{ApiError, AppServicesError, AssessmentError, IdentityError};
pub use identity_service::IdentityService;
pub use results::ResultsView;
