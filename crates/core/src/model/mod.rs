mod answers;
mod attempt;
mod identity;
mod ids;
mod question;
mod test_paper;

pub use ids::{AttemptId, ParseIdError, QuestionId, SessionId, StudentId, TeacherId, TestId};

pub use answers::{AnswerSet, SubmittedAnswer};
pub use attempt::{AttemptSubmission, ScoreBand, SubmissionResult, SubmitTrigger};
pub use identity::{Identity, ParseRoleError, Role};
pub use question::{Question, QuestionError, option_label};
pub use test_paper::{TestPaper, TestPaperError};
