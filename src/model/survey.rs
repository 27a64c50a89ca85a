//! Survey structure: groups, questions, sub-questions and the closing message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of sub-questions a scale question can fan out into
pub const MAX_SUB_QUESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Scale,
    Text,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Scale => "scale",
            QuestionType::Text => "text",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scale" => Some(QuestionType::Scale),
            "text" => Some(QuestionType::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuestion {
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub group_id: String,
    pub text: String,
    pub order_index: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub sub_questions: Vec<SubQuestion>,
    #[serde(default)]
    pub include_none_option: bool,
}

impl Question {
    pub fn is_scale(&self) -> bool {
        self.question_type == QuestionType::Scale
    }

    pub fn sub_question(&self, id: &str) -> Option<&SubQuestion> {
        self.sub_questions.iter().find(|sub| sub.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGroup {
    pub id: String,
    pub survey_id: String,
    pub title: String,
    pub order_index: i64,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Presentation of the message shown after a survey is submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClosingMessage {
    pub text: String,
    pub color: String,
    pub font_size: u32,
    pub font_weight: u32,
    pub font_style: String,
    pub text_align: String,
    pub font_family: String,
}

impl Default for ClosingMessage {
    fn default() -> Self {
        Self {
            text: "설문에 참여해 주셔서 감사합니다.".to_string(),
            color: "#1f2937".to_string(),
            font_size: 18,
            font_weight: 600,
            font_style: "normal".to_string(),
            text_align: "center".to_string(),
            font_family: "inherit".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub background_color: Option<String>,
    pub question_groups: Vec<QuestionGroup>,
    pub closing_message: ClosingMessage,
    pub created_at: DateTime<Utc>,
}

impl Survey {
    /// A survey is published once some group holds at least one question
    pub fn is_published(&self) -> bool {
        self.question_groups.iter().any(|group| !group.questions.is_empty())
    }

    pub fn question_count(&self) -> usize {
        self.question_groups.iter().map(|group| group.questions.len()).sum()
    }

    pub fn questions(&self) -> impl Iterator<Item = (&QuestionGroup, &Question)> {
        self.question_groups
            .iter()
            .flat_map(|group| group.questions.iter().map(move |question| (group, question)))
    }

    pub fn find_question(&self, question_id: &str) -> Option<(&QuestionGroup, &Question)> {
        self.questions().find(|(_, question)| question.id == question_id)
    }
}

/// Composite key identifying one answer slot within a response
pub fn answer_key(question_id: &str, sub_question_id: Option<&str>) -> String {
    match sub_question_id {
        Some(sub_id) => format!("{}:{}", question_id, sub_id),
        None => question_id.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuestionDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub sub_questions: Vec<SubQuestionDraft>,
    #[serde(default)]
    pub include_none_option: bool,
}

impl QuestionDraft {
    pub fn new(question_type: QuestionType) -> Self {
        Self {
            id: None,
            text: String::new(),
            question_type,
            sub_questions: Vec::new(),
            include_none_option: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

/// Full replacement structure for creating or editing a survey.
///
/// Ids present on groups, questions and sub-questions are kept by the
/// gateway; missing ids are generated on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub question_groups: Vec<GroupDraft>,
    #[serde(default)]
    pub closing_message: ClosingMessage,
}

impl From<&Survey> for SurveyDraft {
    fn from(survey: &Survey) -> Self {
        Self {
            title: survey.title.clone(),
            description: survey.description.clone(),
            background_color: survey.background_color.clone(),
            question_groups: survey
                .question_groups
                .iter()
                .map(|group| GroupDraft {
                    id: Some(group.id.clone()),
                    title: group.title.clone(),
                    questions: group
                        .questions
                        .iter()
                        .map(|question| QuestionDraft {
                            id: Some(question.id.clone()),
                            text: question.text.clone(),
                            question_type: question.question_type,
                            sub_questions: question
                                .sub_questions
                                .iter()
                                .map(|sub| SubQuestionDraft {
                                    id: Some(sub.id.clone()),
                                    text: sub.text.clone(),
                                })
                                .collect(),
                            include_none_option: question.include_none_option,
                        })
                        .collect(),
                })
                .collect(),
            closing_message: survey.closing_message.clone(),
        }
    }
}

/// A question found by id regardless of which survey currently owns it
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedQuestion {
    pub survey_id: String,
    pub group_title: String,
    pub group_order: i64,
    pub question: Question,
}

/// Survey listing row for the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummary {
    pub id: String,
    pub title: String,
    pub group_count: i64,
    pub question_count: i64,
    pub response_count: i64,
    pub created_at: DateTime<Utc>,
}
