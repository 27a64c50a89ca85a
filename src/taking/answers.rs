use serde_json::{Map, Value};
use std::collections::HashMap;

use super::SubmissionError;
use crate::model::{Answer, AnswerValue, NewResponse, PatientType, QuestionType, Survey, answer_key};

/// Answer state of one slot while the survey is being filled in
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerState {
    /// No scale point chosen yet; distinct from not applicable
    Unanswered,
    Scale(i64),
    NotApplicable,
    Text(String),
}

/// One answerable unit: a text question, a scale question without
/// sub-questions, or a single sub-question
#[derive(Debug, Clone)]
pub struct AnswerSlot {
    pub question_id: String,
    pub sub_question_id: Option<String>,
    pub label: String,
    pub kind: QuestionType,
    pub allows_not_applicable: bool,
    pub state: AnswerState,
}

impl AnswerSlot {
    pub fn key(&self) -> String {
        answer_key(&self.question_id, self.sub_question_id.as_deref())
    }

    fn check(&self) -> Result<(), SubmissionError> {
        match (&self.kind, &self.state) {
            (QuestionType::Scale, AnswerState::Scale(value)) if (1..=5).contains(value) => Ok(()),
            (QuestionType::Scale, AnswerState::Scale(value)) => Err(SubmissionError::OutOfRange {
                question: self.label.clone(),
                value: *value,
            }),
            (QuestionType::Scale, AnswerState::NotApplicable) if self.allows_not_applicable => Ok(()),
            (QuestionType::Scale, AnswerState::NotApplicable) => Err(SubmissionError::NotApplicableNotAllowed {
                question: self.label.clone(),
            }),
            (QuestionType::Text, AnswerState::Text(text)) if !text.trim().is_empty() => Ok(()),
            (QuestionType::Text, AnswerState::Text(_)) => Err(SubmissionError::EmptyText {
                question: self.label.clone(),
            }),
            _ => Err(SubmissionError::Unanswered {
                question: self.label.clone(),
            }),
        }
    }

    fn to_answer(&self) -> Option<Answer> {
        let value = match &self.state {
            AnswerState::Unanswered => return None,
            AnswerState::Scale(value) => AnswerValue::Scale(*value),
            AnswerState::NotApplicable => AnswerValue::NotApplicable,
            AnswerState::Text(text) => AnswerValue::Text(text.trim().to_string()),
        };
        Some(Answer::new(&self.question_id, self.sub_question_id.as_deref(), value))
    }
}

/// Answer map for one survey, keyed by `questionId` or
/// `questionId:subQuestionId` in survey order
#[derive(Debug, Clone)]
pub struct AnswerSheet {
    survey_id: String,
    slots: Vec<AnswerSlot>,
    index: HashMap<String, usize>,
}

impl AnswerSheet {
    pub fn new(survey: &Survey) -> Self {
        let mut slots = Vec::new();

        for (_, question) in survey.questions() {
            match question.question_type {
                QuestionType::Text => slots.push(AnswerSlot {
                    question_id: question.id.clone(),
                    sub_question_id: None,
                    label: question.text.clone(),
                    kind: QuestionType::Text,
                    allows_not_applicable: false,
                    state: AnswerState::Text(String::new()),
                }),
                QuestionType::Scale if question.sub_questions.is_empty() => slots.push(AnswerSlot {
                    question_id: question.id.clone(),
                    sub_question_id: None,
                    label: question.text.clone(),
                    kind: QuestionType::Scale,
                    allows_not_applicable: question.include_none_option,
                    state: AnswerState::Unanswered,
                }),
                QuestionType::Scale => {
                    for sub in &question.sub_questions {
                        slots.push(AnswerSlot {
                            question_id: question.id.clone(),
                            sub_question_id: Some(sub.id.clone()),
                            label: format!("{} ({})", question.text, sub.text),
                            kind: QuestionType::Scale,
                            allows_not_applicable: question.include_none_option,
                            state: AnswerState::Unanswered,
                        });
                    }
                }
            }
        }

        let index = slots.iter().enumerate().map(|(i, slot)| (slot.key(), i)).collect();

        Self {
            survey_id: survey.id.clone(),
            slots,
            index,
        }
    }

    pub fn survey_id(&self) -> &str {
        &self.survey_id
    }

    pub fn slots(&self) -> &[AnswerSlot] {
        &self.slots
    }

    pub fn state(&self, key: &str) -> Option<&AnswerState> {
        self.index.get(key).map(|&i| &self.slots[i].state)
    }

    /// Slots that currently pass validation
    pub fn answered_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.check().is_ok()).count()
    }

    pub fn set_scale(&mut self, key: &str, value: i64) -> Result<(), SubmissionError> {
        self.set(key, QuestionType::Scale, AnswerState::Scale(value))
    }

    pub fn set_not_applicable(&mut self, key: &str) -> Result<(), SubmissionError> {
        self.set(key, QuestionType::Scale, AnswerState::NotApplicable)
    }

    pub fn set_text(&mut self, key: &str, text: &str) -> Result<(), SubmissionError> {
        self.set(key, QuestionType::Text, AnswerState::Text(text.to_string()))
    }

    /// Reset a slot to its initial state
    pub fn clear(&mut self, key: &str) -> Result<(), SubmissionError> {
        let slot = self.slot_mut(key)?;
        slot.state = match slot.kind {
            QuestionType::Scale => AnswerState::Unanswered,
            QuestionType::Text => AnswerState::Text(String::new()),
        };
        Ok(())
    }

    /// Apply a submitted answer to its slot
    pub(crate) fn record(&mut self, answer: &Answer) -> Result<(), SubmissionError> {
        let key = answer.key();
        match &answer.value {
            AnswerValue::Scale(value) => self.set_scale(&key, *value),
            AnswerValue::NotApplicable => self.set_not_applicable(&key),
            AnswerValue::Text(text) => self.set_text(&key, text),
        }
    }

    /// Check every slot and the patient type
    pub fn validate(&self, patient_type: Option<&str>) -> Result<PatientType, SubmissionError> {
        for slot in &self.slots {
            slot.check()?;
        }

        let patient_type = patient_type
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SubmissionError::MissingPatientType)?;

        PatientType::parse(patient_type).ok_or_else(|| SubmissionError::UnknownPatientType(patient_type.to_string()))
    }

    /// Validate and build the payload posted on submit
    pub fn into_submission(
        self,
        patient_name: Option<String>,
        patient_type: Option<&str>,
        patient_info_answers: Option<Map<String, Value>>,
    ) -> Result<NewResponse, SubmissionError> {
        let patient_type = self.validate(patient_type)?;

        Ok(NewResponse {
            answers: self.slots.iter().filter_map(AnswerSlot::to_answer).collect(),
            survey_id: self.survey_id,
            patient_name: patient_name.map(|name| name.trim().to_string()).filter(|name| !name.is_empty()),
            patient_type: Some(patient_type.as_str().to_string()),
            patient_info_answers,
        })
    }

    fn set(&mut self, key: &str, expected: QuestionType, state: AnswerState) -> Result<(), SubmissionError> {
        let slot = self.slot_mut(key)?;
        if slot.kind != expected {
            return Err(SubmissionError::WrongAnswerType {
                question: slot.label.clone(),
            });
        }
        slot.state = state;
        Ok(())
    }

    fn slot_mut(&mut self, key: &str) -> Result<&mut AnswerSlot, SubmissionError> {
        let index = *self
            .index
            .get(key)
            .ok_or_else(|| SubmissionError::UnknownQuestion(key.to_string()))?;
        Ok(&mut self.slots[index])
    }
}
