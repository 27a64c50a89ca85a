use std::collections::HashSet;
use thiserror::Error;

use super::AnswerSheet;
use crate::model::{NewResponse, PatientType, Survey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("question \"{question}\" has not been answered")]
    Unanswered { question: String },

    #[error("question \"{question}\" must be answered between 1 and 5, got {value}")]
    OutOfRange { question: String, value: i64 },

    #[error("question \"{question}\" does not offer a not-applicable option")]
    NotApplicableNotAllowed { question: String },

    #[error("question \"{question}\" requires a non-empty text answer")]
    EmptyText { question: String },

    #[error("answer type does not match question \"{question}\"")]
    WrongAnswerType { question: String },

    #[error("answer refers to unknown question \"{0}\"")]
    UnknownQuestion(String),

    #[error("question \"{0}\" was answered more than once")]
    DuplicateAnswer(String),

    #[error("patient type is required")]
    MissingPatientType,

    #[error("unknown patient type \"{0}\"")]
    UnknownPatientType(String),

    #[error("response targets survey \"{actual}\" but was submitted for \"{expected}\"")]
    SurveyMismatch { expected: String, actual: String },
}

/// Check a submitted payload against the survey it answers.
///
/// Applies the same rules as the interactive [`AnswerSheet`] and additionally
/// rejects unknown keys, duplicate keys and answers of the wrong shape.
pub fn validate_submission(survey: &Survey, response: &NewResponse) -> Result<PatientType, SubmissionError> {
    if response.survey_id != survey.id {
        return Err(SubmissionError::SurveyMismatch {
            expected: survey.id.clone(),
            actual: response.survey_id.clone(),
        });
    }

    let mut sheet = AnswerSheet::new(survey);
    let mut seen = HashSet::new();
    for answer in &response.answers {
        let key = answer.key();
        if sheet.state(&key).is_none() {
            return Err(SubmissionError::UnknownQuestion(key));
        }
        if !seen.insert(key.clone()) {
            return Err(SubmissionError::DuplicateAnswer(key));
        }
        sheet.record(answer)?;
    }

    sheet.validate(response.patient_type.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, ClosingMessage, Question, QuestionGroup, QuestionType};
    use chrono::Utc;

    fn survey() -> Survey {
        let question = |id: &str, kind: QuestionType, none: bool| Question {
            id: id.to_string(),
            group_id: "g".to_string(),
            text: id.to_uppercase(),
            order_index: 0,
            question_type: kind,
            sub_questions: vec![],
            include_none_option: none,
        };

        Survey {
            id: "survey".to_string(),
            title: "t".to_string(),
            description: None,
            background_color: None,
            question_groups: vec![QuestionGroup {
                id: "g".to_string(),
                survey_id: "survey".to_string(),
                title: "G".to_string(),
                order_index: 0,
                questions: vec![
                    question("a", QuestionType::Scale, true),
                    question("b", QuestionType::Text, false),
                ],
            }],
            closing_message: ClosingMessage::default(),
            created_at: Utc::now(),
        }
    }

    fn submission(answers: Vec<Answer>) -> NewResponse {
        NewResponse {
            survey_id: "survey".to_string(),
            patient_type: Some("outpatient".to_string()),
            answers,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_submission() {
        let response = submission(vec![Answer::not_applicable("a", None), Answer::text("b", "ok")]);
        assert_eq!(validate_submission(&survey(), &response), Ok(PatientType::Outpatient));
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let response = submission(vec![
            Answer::scale("a", None, 2),
            Answer::scale("a", None, 3),
            Answer::text("b", "ok"),
        ]);
        assert_eq!(
            validate_submission(&survey(), &response),
            Err(SubmissionError::DuplicateAnswer("a".to_string()))
        );
    }

    #[test]
    fn test_unknown_and_mismatched_answers() {
        let response = submission(vec![Answer::scale("zzz", None, 2)]);
        assert_eq!(
            validate_submission(&survey(), &response),
            Err(SubmissionError::UnknownQuestion("zzz".to_string()))
        );

        let response = submission(vec![Answer::text("a", "five"), Answer::text("b", "ok")]);
        assert!(matches!(
            validate_submission(&survey(), &response),
            Err(SubmissionError::WrongAnswerType { .. })
        ));

        let response = submission(vec![Answer::scale("a", None, 9), Answer::text("b", "ok")]);
        assert!(matches!(
            validate_submission(&survey(), &response),
            Err(SubmissionError::OutOfRange { value: 9, .. })
        ));
    }

    #[test]
    fn test_missing_answer_and_wrong_survey() {
        let response = submission(vec![Answer::text("b", "ok")]);
        assert!(matches!(
            validate_submission(&survey(), &response),
            Err(SubmissionError::Unanswered { .. })
        ));

        let mut response = submission(vec![Answer::scale("a", None, 1), Answer::text("b", "ok")]);
        response.survey_id = "other".to_string();
        assert!(matches!(
            validate_submission(&survey(), &response),
            Err(SubmissionError::SurveyMismatch { .. })
        ));
    }
}
