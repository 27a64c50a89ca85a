//! Survey authoring: an editable question tree that produces drafts for the
//! storage gateway

mod builder;
mod validation;

pub use builder::SurveyBuilder;
pub use validation::{DraftError, validate_draft};
