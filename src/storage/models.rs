//! Row shapes read from the survey database

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::model::{Answer, AnswerValue, QuestionType, SubQuestion};

#[derive(Debug, Clone, FromRow)]
pub struct DbSurvey {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub background_color: Option<String>,
    pub closing_message: String, // JSON
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbQuestionGroup {
    pub id: String,
    pub survey_id: String,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbQuestion {
    pub id: String,
    pub group_id: String,
    pub text: String,
    pub order_index: i64,
    pub r#type: String,
    pub include_none_option: bool,
}

impl DbQuestion {
    pub fn question_type(&self) -> QuestionType {
        // The CHECK constraint only admits 'scale' and 'text'
        QuestionType::parse(&self.r#type).unwrap_or(QuestionType::Scale)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbSubQuestion {
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub order_index: i64,
}

impl From<DbSubQuestion> for SubQuestion {
    fn from(row: DbSubQuestion) -> Self {
        Self {
            id: row.id,
            question_id: row.question_id,
            text: row.text,
            order_index: row.order_index,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbResponse {
    pub id: String,
    pub survey_id: String,
    pub patient_name: Option<String>,
    pub patient_type: Option<String>,
    pub patient_info_answers: Option<String>, // JSON
    pub question_snapshot: Option<String>,    // JSON
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbAnswer {
    pub response_id: String,
    pub question_id: String,
    pub sub_question_id: Option<String>,
    pub value: Option<i64>,
    pub text_value: Option<String>,
}

impl From<DbAnswer> for Answer {
    fn from(row: DbAnswer) -> Self {
        let value = match (row.value, row.text_value) {
            (Some(value), _) => AnswerValue::Scale(value),
            (None, Some(text)) => AnswerValue::Text(text),
            (None, None) => AnswerValue::NotApplicable,
        };

        Self {
            question_id: row.question_id,
            sub_question_id: row.sub_question_id,
            value,
        }
    }
}

/// Column values stored for an answer: `(value, text_value)`
pub fn answer_columns(value: &AnswerValue) -> (Option<i64>, Option<&str>) {
    match value {
        AnswerValue::Scale(value) => (Some(*value), None),
        AnswerValue::NotApplicable => (None, None),
        AnswerValue::Text(text) => (None, Some(text.as_str())),
    }
}
