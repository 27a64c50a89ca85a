//! Domain records shared by the gateway, the flows and the HTTP surface

pub mod homepage;
pub mod range;
pub mod response;
pub mod survey;

pub use homepage::HomepageConfig;
pub use range::DateRange;
pub use response::{Answer, AnswerValue, NewResponse, PatientType, QuestionSnapshot, Response};
pub use survey::{
    ClosingMessage, GroupDraft, LocatedQuestion, MAX_SUB_QUESTIONS, Question, QuestionDraft, QuestionGroup, QuestionType,
    SubQuestion, SubQuestionDraft, Survey, SurveyDraft, SurveySummary, answer_key,
};
