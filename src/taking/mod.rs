//! Survey taking flow: per-question answer state, completeness checks and
//! the submission payload

mod answers;
mod validation;

pub use answers::{AnswerSheet, AnswerSlot, AnswerState};
pub use validation::{SubmissionError, validate_submission};
