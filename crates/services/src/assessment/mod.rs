//! Timed test-taking: loading a paper, running its countdown, and
//! delivering the single submission.

mod config;
mod runner;
mod service;
mod ticker;
mod view;

pub use config::{AssessmentConfig, DurationPolicy};
pub use runner::{AssessmentRunner, RunnerPhase, SubmitReport, TickReport};
pub use service::AssessmentService;
pub use ticker::Ticker;
pub use view::{Banner, DANGER_THRESHOLD_SECS, SessionView, Urgency, WARNING_THRESHOLD_SECS};
