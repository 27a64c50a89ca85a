//! Submitted responses and their answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::survey::{QuestionGroup, answer_key};

/// Patient categories a response can be tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatientType {
    Outpatient,
    Ward3,
    Ward6,
    Checkup,
}

impl PatientType {
    pub const ALL: [PatientType; 4] = [
        PatientType::Outpatient,
        PatientType::Ward3,
        PatientType::Ward6,
        PatientType::Checkup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatientType::Outpatient => "outpatient",
            PatientType::Ward3 => "ward-3",
            PatientType::Ward6 => "ward-6",
            PatientType::Checkup => "checkup",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value.trim())
    }
}

/// The value carried by a single answer
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    /// Point on the 1-5 scale
    Scale(i64),
    /// Explicit "not applicable" for scale questions offering it
    NotApplicable,
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnswerPayload", into = "AnswerPayload")]
pub struct Answer {
    pub question_id: String,
    pub sub_question_id: Option<String>,
    pub value: AnswerValue,
}

impl Answer {
    pub fn scale(question_id: &str, sub_question_id: Option<&str>, value: i64) -> Self {
        Self::new(question_id, sub_question_id, AnswerValue::Scale(value))
    }

    pub fn not_applicable(question_id: &str, sub_question_id: Option<&str>) -> Self {
        Self::new(question_id, sub_question_id, AnswerValue::NotApplicable)
    }

    pub fn text(question_id: &str, text: &str) -> Self {
        Self::new(question_id, None, AnswerValue::Text(text.to_string()))
    }

    pub fn new(question_id: &str, sub_question_id: Option<&str>, value: AnswerValue) -> Self {
        Self {
            question_id: question_id.to_string(),
            sub_question_id: sub_question_id.map(str::to_string),
            value,
        }
    }

    pub fn key(&self) -> String {
        answer_key(&self.question_id, self.sub_question_id.as_deref())
    }

    pub fn numeric_value(&self) -> Option<i64> {
        match self.value {
            AnswerValue::Scale(value) => Some(value),
            _ => None,
        }
    }

    pub fn text_value(&self) -> Option<&str> {
        match &self.value {
            AnswerValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Wire shape of an answer: `value: null` means not applicable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerPayload {
    question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub_question_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    value: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_value: Option<String>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

impl TryFrom<AnswerPayload> for Answer {
    type Error = String;

    fn try_from(payload: AnswerPayload) -> Result<Self, Self::Error> {
        let value = match (payload.value, payload.text_value) {
            (Some(Some(value)), None) => AnswerValue::Scale(value),
            (Some(None), None) => AnswerValue::NotApplicable,
            (None, Some(text)) => AnswerValue::Text(text),
            (Some(_), Some(_)) => {
                return Err(format!(
                    "answer for question {} carries both value and textValue",
                    payload.question_id
                ));
            }
            (None, None) => {
                return Err(format!(
                    "answer for question {} carries neither value nor textValue",
                    payload.question_id
                ));
            }
        };

        Ok(Self {
            question_id: payload.question_id,
            sub_question_id: payload.sub_question_id,
            value,
        })
    }
}

impl From<Answer> for AnswerPayload {
    fn from(answer: Answer) -> Self {
        let (value, text_value) = match answer.value {
            AnswerValue::Scale(value) => (Some(Some(value)), None),
            AnswerValue::NotApplicable => (Some(None), None),
            AnswerValue::Text(text) => (None, Some(text)),
        };

        Self {
            question_id: answer.question_id,
            sub_question_id: answer.sub_question_id,
            value,
            text_value,
        }
    }
}

/// Copy of a survey's question tree taken when a response is submitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionSnapshot {
    pub groups: Vec<QuestionGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    pub survey_id: String,
    pub patient_name: Option<String>,
    pub patient_type: Option<String>,
    pub patient_info_answers: Option<Map<String, Value>>,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_snapshot: Option<QuestionSnapshot>,
}

impl Response {
    pub fn find_answer(&self, question_id: &str, sub_question_id: Option<&str>) -> Option<&Answer> {
        self.answers.iter().find(|answer| {
            answer.question_id == question_id && answer.sub_question_id.as_deref() == sub_question_id
        })
    }
}

/// Payload accepted when a patient submits a survey
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResponse {
    pub survey_id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_type: Option<String>,
    #[serde(default)]
    pub patient_info_answers: Option<Map<String, Value>>,
    pub answers: Vec<Answer>,
}
