use thiserror::Error;

use crate::model::{QuestionError, TestPaperError};
use crate::session::SessionError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    TestPaper(#[from] TestPaperError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
