use thiserror::Error;

use crate::model::{MAX_SUB_QUESTIONS, QuestionType, SurveyDraft};

/// Positions in messages are 1-based, as shown in the editor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("survey title is required")]
    EmptyTitle,

    #[error("group {group} needs a title")]
    EmptyGroupTitle { group: usize },

    #[error("question {question} in group {group} needs text")]
    EmptyQuestionText { group: usize, question: usize },

    #[error("sub-question {sub} of question {question} in group {group} needs text")]
    EmptySubQuestionText { group: usize, question: usize, sub: usize },

    #[error("question {question} in group {group} has {count} sub-questions (max {max})", max = MAX_SUB_QUESTIONS)]
    TooManySubQuestions { group: usize, question: usize, count: usize },

    #[error("text question {question} in group {group} cannot have sub-questions")]
    SubQuestionsOnText { group: usize, question: usize },

    #[error("closing message text is required")]
    EmptyClosingMessage,
}

/// Check a draft before it is created or used to replace a survey
pub fn validate_draft(draft: &SurveyDraft) -> Result<(), DraftError> {
    if draft.title.trim().is_empty() {
        return Err(DraftError::EmptyTitle);
    }

    for (gi, group) in draft.question_groups.iter().enumerate() {
        let group_no = gi + 1;
        if group.title.trim().is_empty() {
            return Err(DraftError::EmptyGroupTitle { group: group_no });
        }

        for (qi, question) in group.questions.iter().enumerate() {
            let question_no = qi + 1;
            if question.text.trim().is_empty() {
                return Err(DraftError::EmptyQuestionText {
                    group: group_no,
                    question: question_no,
                });
            }

            if question.question_type == QuestionType::Text && !question.sub_questions.is_empty() {
                return Err(DraftError::SubQuestionsOnText {
                    group: group_no,
                    question: question_no,
                });
            }

            if question.sub_questions.len() > MAX_SUB_QUESTIONS {
                return Err(DraftError::TooManySubQuestions {
                    group: group_no,
                    question: question_no,
                    count: question.sub_questions.len(),
                });
            }

            if let Some(si) = question.sub_questions.iter().position(|sub| sub.text.trim().is_empty()) {
                return Err(DraftError::EmptySubQuestionText {
                    group: group_no,
                    question: question_no,
                    sub: si + 1,
                });
            }
        }
    }

    if draft.closing_message.text.trim().is_empty() {
        return Err(DraftError::EmptyClosingMessage);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupDraft, QuestionDraft, SubQuestionDraft};

    fn draft() -> SurveyDraft {
        SurveyDraft {
            title: "Visit".to_string(),
            question_groups: vec![GroupDraft {
                id: None,
                title: "Service".to_string(),
                questions: vec![QuestionDraft {
                    text: "Friendliness".to_string(),
                    ..QuestionDraft::new(QuestionType::Scale)
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_draft() {
        assert_eq!(validate_draft(&draft()), Ok(()));
    }

    #[test]
    fn test_blank_fields_are_reported() {
        let mut d = draft();
        d.title = "  ".to_string();
        assert_eq!(validate_draft(&d), Err(DraftError::EmptyTitle));

        let mut d = draft();
        d.question_groups[0].questions[0].text = String::new();
        assert_eq!(
            validate_draft(&d),
            Err(DraftError::EmptyQuestionText { group: 1, question: 1 })
        );

        let mut d = draft();
        d.closing_message.text = " ".to_string();
        assert_eq!(validate_draft(&d), Err(DraftError::EmptyClosingMessage));
    }

    #[test]
    fn test_sub_question_rules() {
        let sub = |text: &str| SubQuestionDraft {
            id: None,
            text: text.to_string(),
        };

        let mut d = draft();
        d.question_groups[0].questions[0].sub_questions = (0..6).map(|i| sub(&format!("item {i}"))).collect();
        assert!(matches!(
            validate_draft(&d),
            Err(DraftError::TooManySubQuestions { count: 6, .. })
        ));

        let mut d = draft();
        d.question_groups[0].questions[0].sub_questions = vec![sub("Lobby"), sub("")];
        assert_eq!(
            validate_draft(&d),
            Err(DraftError::EmptySubQuestionText {
                group: 1,
                question: 1,
                sub: 2
            })
        );

        let mut d = draft();
        d.question_groups[0].questions[0].question_type = QuestionType::Text;
        d.question_groups[0].questions[0].sub_questions = vec![sub("Lobby")];
        assert_eq!(
            validate_draft(&d),
            Err(DraftError::SubQuestionsOnText { group: 1, question: 1 })
        );
    }
}
