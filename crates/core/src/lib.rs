#![forbid(unsafe_code)]

pub mod error;
pub mod grading;
pub mod model;
pub mod session;
pub mod time;

pub use error::Error;
pub use session::{
    Delivery, SessionError, SessionStatus, SubmitDecision, TickOutcome, TimedSession,
};
pub use time::Clock;
