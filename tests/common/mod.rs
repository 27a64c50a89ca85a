//! Shared fixtures for the integration tests
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use patient_survey::model::{
    Answer, GroupDraft, NewResponse, QuestionDraft, QuestionType, SubQuestionDraft, Survey, SurveyDraft,
};
use patient_survey::storage::Storage;

pub async fn storage() -> Storage {
    Storage::open_memory().await.expect("in-memory storage")
}

fn question(text: &str, question_type: QuestionType, subs: &[&str], include_none_option: bool) -> QuestionDraft {
    QuestionDraft {
        id: None,
        text: text.to_string(),
        question_type,
        sub_questions: subs
            .iter()
            .map(|text| SubQuestionDraft {
                id: None,
                text: text.to_string(),
            })
            .collect(),
        include_none_option,
    }
}

/// "Service": Friendliness (scale, not-applicable allowed), Facilities
/// (scale with Lobby/Rooms), Comments (text)
pub fn sample_draft() -> SurveyDraft {
    SurveyDraft {
        title: "Outpatient visit".to_string(),
        description: Some("How was your visit?".to_string()),
        question_groups: vec![GroupDraft {
            id: None,
            title: "Service".to_string(),
            questions: vec![
                question("Friendliness", QuestionType::Scale, &[], true),
                question("Facilities", QuestionType::Scale, &["Lobby", "Rooms"], false),
                question("Comments", QuestionType::Text, &[], false),
            ],
        }],
        ..Default::default()
    }
}

/// Friendliness + Comments only, the smallest useful survey
pub fn two_question_draft() -> SurveyDraft {
    SurveyDraft {
        title: "Ward stay".to_string(),
        question_groups: vec![GroupDraft {
            id: None,
            title: "Service".to_string(),
            questions: vec![
                question("Friendliness", QuestionType::Scale, &[], true),
                question("Comments", QuestionType::Text, &[], false),
            ],
        }],
        ..Default::default()
    }
}

/// One valid answer per answerable unit of `survey`
pub fn complete_answers(survey: &Survey, scale: i64, text: &str) -> Vec<Answer> {
    let mut answers = Vec::new();
    for (_, question) in survey.questions() {
        match question.question_type {
            QuestionType::Text => answers.push(Answer::text(&question.id, text)),
            QuestionType::Scale if question.sub_questions.is_empty() => {
                answers.push(Answer::scale(&question.id, None, scale))
            }
            QuestionType::Scale => {
                for sub in &question.sub_questions {
                    answers.push(Answer::scale(&question.id, Some(&sub.id), scale));
                }
            }
        }
    }
    answers
}

pub fn submission(survey: &Survey, patient_type: &str, answers: Vec<Answer>) -> NewResponse {
    NewResponse {
        survey_id: survey.id.clone(),
        patient_name: Some("홍길동".to_string()),
        patient_type: Some(patient_type.to_string()),
        patient_info_answers: None,
        answers,
    }
}

pub fn utc(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0).unwrap()
}
