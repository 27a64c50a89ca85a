//! Column descriptors: which question or sub-question each answer column
//! shows, under which label and in which order
//!
//! The current survey structure seeds the columns. Answers whose key is not
//! covered are resolved against the response's snapshot, then the question
//! catalog, and finally fall back to a placeholder so no answer is dropped.

use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Answer, AnswerValue, LocatedQuestion, QuestionGroup, QuestionSnapshot, QuestionType, Response, Survey, answer_key,
};

pub const DELETED_QUESTION_LABEL: &str = "[deleted question]";
pub const DELETED_SUB_QUESTION_LABEL: &str = "[deleted sub-question]";
pub const TEXT_SUFFIX: &str = "(주관식)";

/// Columns recovered from history sort after every current column
pub const HISTORICAL_ORDER_OFFSET: i64 = 100_000;
pub const PLACEHOLDER_ORDER: i64 = 999_999;

/// Where a descriptor's label came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorSource {
    /// Seeded column of the current structure
    Current,
    Snapshot,
    /// Question still in the current survey, key no longer a column
    CurrentStructure,
    /// By-id lookup across all surveys
    Catalog,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub key: String,
    pub question_id: String,
    pub sub_question_id: Option<String>,
    pub label: String,
    pub question_type: QuestionType,
    pub order: i64,
    pub source: DescriptorSource,
}

impl Descriptor {
    pub fn is_text(&self) -> bool {
        self.question_type == QuestionType::Text
    }
}

/// Question catalog keyed by question id, spanning every survey
pub type QuestionCatalog = HashMap<String, LocatedQuestion>;

fn structural_order(group_index: usize, question_index: usize, sub_index: usize) -> i64 {
    (group_index * 1000 + question_index * 10 + sub_index) as i64
}

fn column_label(group: &str, question: &str, question_type: QuestionType, sub: Option<&str>) -> String {
    match (question_type, sub) {
        (QuestionType::Text, _) => format!("{} - {} {}", group, question, TEXT_SUFFIX),
        (QuestionType::Scale, Some(sub)) => format!("{} - {} ({})", group, question, sub),
        (QuestionType::Scale, None) => format!("{} - {}", group, question),
    }
}

/// One descriptor per answerable unit of the current structure, in survey
/// order. Present even when nobody answered.
pub fn seed_descriptors(survey: &Survey) -> Vec<Descriptor> {
    let mut descriptors = Vec::new();

    for (gi, group) in survey.question_groups.iter().enumerate() {
        for (qi, question) in group.questions.iter().enumerate() {
            let units: Vec<(usize, Option<&str>, Option<&str>)> =
                if question.is_scale() && !question.sub_questions.is_empty() {
                    question
                        .sub_questions
                        .iter()
                        .enumerate()
                        .map(|(si, sub)| (si, Some(sub.id.as_str()), Some(sub.text.as_str())))
                        .collect()
                } else {
                    vec![(0, None, None)]
                };

            for (si, sub_id, sub_text) in units {
                descriptors.push(Descriptor {
                    key: answer_key(&question.id, sub_id),
                    question_id: question.id.clone(),
                    sub_question_id: sub_id.map(str::to_string),
                    label: column_label(&group.title, &question.text, question.question_type, sub_text),
                    question_type: question.question_type,
                    order: structural_order(gi, qi, si),
                    source: DescriptorSource::Current,
                });
            }
        }
    }

    descriptors
}

/// Question found in some structure, with its structural position
struct Located<'a> {
    group_title: &'a str,
    question_text: &'a str,
    question_type: QuestionType,
    order: i64,
    /// `None` when a sub-question was asked for and is not present
    sub: Option<Option<&'a str>>,
}

fn locate_in_groups<'a>(groups: &'a [QuestionGroup], question_id: &str, sub_id: Option<&str>) -> Option<Located<'a>> {
    groups.iter().enumerate().find_map(|(gi, group)| {
        group
            .questions
            .iter()
            .enumerate()
            .find(|(_, question)| question.id == question_id)
            .map(|(qi, question)| {
                let (si, sub) = match sub_id {
                    None => (0, Some(None)),
                    Some(sub_id) => match question.sub_questions.iter().position(|sub| sub.id == sub_id) {
                        Some(si) => (si, Some(Some(question.sub_questions[si].text.as_str()))),
                        None => (0, None),
                    },
                };
                Located {
                    group_title: &group.title,
                    question_text: &question.text,
                    question_type: question.question_type,
                    order: structural_order(gi, qi, si),
                    sub,
                }
            })
    })
}

fn locate_in_catalog<'a>(catalog: &'a QuestionCatalog, question_id: &str, sub_id: Option<&str>) -> Option<Located<'a>> {
    let located = catalog.get(question_id)?;
    let question = &located.question;
    let (sub_order, sub) = match sub_id {
        None => (0, Some(None)),
        Some(sub_id) => match question.sub_question(sub_id) {
            Some(sub) => (sub.order_index, Some(Some(sub.text.as_str()))),
            None => (0, None),
        },
    };

    Some(Located {
        group_title: &located.group_title,
        question_text: &question.text,
        question_type: question.question_type,
        order: located.group_order * 1000 + question.order_index * 10 + sub_order,
        sub,
    })
}

fn answer_type(answer: &Answer) -> QuestionType {
    match answer.value {
        AnswerValue::Text(_) => QuestionType::Text,
        _ => QuestionType::Scale,
    }
}

/// Describe an answer key that the current structure does not cover.
///
/// Tiers: the response's snapshot, then the current survey (the question
/// survived but the key no longer matches a column), then the global
/// catalog. A question found without its sub-question keeps the question's
/// label with a deleted sub-question marker and sorts with the placeholders.
pub fn resolve_descriptor(
    answer: &Answer,
    snapshot: Option<&QuestionSnapshot>,
    survey: &Survey,
    catalog: &QuestionCatalog,
) -> Descriptor {
    let question_id = answer.question_id.as_str();
    let sub_id = answer.sub_question_id.as_deref();

    let tiers = [
        (
            snapshot.and_then(|snapshot| locate_in_groups(&snapshot.groups, question_id, sub_id)),
            DescriptorSource::Snapshot,
        ),
        (
            locate_in_groups(&survey.question_groups, question_id, sub_id),
            DescriptorSource::CurrentStructure,
        ),
        (locate_in_catalog(catalog, question_id, sub_id), DescriptorSource::Catalog),
    ];

    let mut partial: Option<(Located, DescriptorSource)> = None;
    for (located, source) in tiers {
        let Some(located) = located else { continue };
        if let Some(sub_text) = located.sub {
            return Descriptor {
                key: answer.key(),
                question_id: question_id.to_string(),
                sub_question_id: sub_id.map(str::to_string),
                label: column_label(located.group_title, located.question_text, located.question_type, sub_text),
                question_type: located.question_type,
                order: HISTORICAL_ORDER_OFFSET + located.order,
                source,
            };
        }
        partial.get_or_insert((located, source));
    }

    let (label, question_type) = match partial {
        Some((located, _)) => (
            column_label(
                located.group_title,
                located.question_text,
                located.question_type,
                Some(DELETED_SUB_QUESTION_LABEL),
            ),
            located.question_type,
        ),
        None => {
            let question_type = answer_type(answer);
            let label = match (question_type, sub_id) {
                (QuestionType::Text, _) => format!("{} {}", DELETED_QUESTION_LABEL, TEXT_SUFFIX),
                (QuestionType::Scale, Some(_)) => {
                    format!("{} ({})", DELETED_QUESTION_LABEL, DELETED_SUB_QUESTION_LABEL)
                }
                (QuestionType::Scale, None) => DELETED_QUESTION_LABEL.to_string(),
            };
            (label, question_type)
        }
    };

    Descriptor {
        key: answer.key(),
        question_id: question_id.to_string(),
        sub_question_id: sub_id.map(str::to_string),
        label,
        question_type,
        order: PLACEHOLDER_ORDER,
        source: DescriptorSource::Placeholder,
    }
}

/// Full, sorted column set for a survey and the responses being exported
pub fn build_descriptors(survey: &Survey, responses: &[&Response], catalog: &QuestionCatalog) -> Vec<Descriptor> {
    let mut by_key: BTreeMap<String, Descriptor> = seed_descriptors(survey)
        .into_iter()
        .map(|descriptor| (descriptor.key.clone(), descriptor))
        .collect();

    for response in responses {
        for answer in &response.answers {
            let key = answer.key();
            if by_key.contains_key(&key) {
                continue;
            }
            let descriptor = resolve_descriptor(answer, response.question_snapshot.as_ref(), survey, catalog);
            by_key.insert(key, descriptor);
        }
    }

    let mut descriptors: Vec<Descriptor> = by_key.into_values().collect();
    descriptors.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.key.cmp(&b.key)));
    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClosingMessage, Question, SubQuestion};
    use chrono::Utc;

    fn question(id: &str, text: &str, question_type: QuestionType, subs: &[(&str, &str)]) -> Question {
        Question {
            id: id.to_string(),
            group_id: "g1".to_string(),
            text: text.to_string(),
            order_index: 0,
            question_type,
            sub_questions: subs
                .iter()
                .enumerate()
                .map(|(i, (sid, stext))| SubQuestion {
                    id: sid.to_string(),
                    question_id: id.to_string(),
                    text: stext.to_string(),
                    order_index: i as i64,
                })
                .collect(),
            include_none_option: false,
        }
    }

    fn survey(questions: Vec<Question>) -> Survey {
        Survey {
            id: "s".to_string(),
            title: "Visit".to_string(),
            description: None,
            background_color: None,
            question_groups: vec![QuestionGroup {
                id: "g1".to_string(),
                survey_id: "s".to_string(),
                title: "Service".to_string(),
                order_index: 0,
                questions,
            }],
            closing_message: ClosingMessage::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_seed_covers_every_unit() {
        let survey = survey(vec![
            question("q1", "Friendliness", QuestionType::Scale, &[]),
            question("q2", "Facilities", QuestionType::Scale, &[("a", "Lobby"), ("b", "Rooms")]),
            question("q3", "Comments", QuestionType::Text, &[]),
        ]);

        let seeded = seed_descriptors(&survey);
        let labels: Vec<&str> = seeded.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Service - Friendliness",
                "Service - Facilities (Lobby)",
                "Service - Facilities (Rooms)",
                "Service - Comments (주관식)",
            ]
        );
        let orders: Vec<i64> = seeded.iter().map(|d| d.order).collect();
        assert_eq!(orders, vec![0, 10, 11, 20]);
    }

    #[test]
    fn test_resolve_from_snapshot() {
        let current = survey(vec![question("q1", "Friendliness", QuestionType::Scale, &[])]);
        let snapshot = QuestionSnapshot {
            groups: vec![QuestionGroup {
                id: "old".to_string(),
                survey_id: "s".to_string(),
                title: "Old group".to_string(),
                order_index: 0,
                questions: vec![
                    question("q1", "Friendliness", QuestionType::Scale, &[]),
                    question("gone", "Parking", QuestionType::Scale, &[]),
                ],
            }],
        };

        let descriptor = resolve_descriptor(
            &Answer::scale("gone", None, 3),
            Some(&snapshot),
            &current,
            &QuestionCatalog::new(),
        );
        assert_eq!(descriptor.label, "Old group - Parking");
        assert_eq!(descriptor.source, DescriptorSource::Snapshot);
        assert_eq!(descriptor.order, HISTORICAL_ORDER_OFFSET + 10);
    }

    #[test]
    fn test_resolve_from_catalog() {
        let current = survey(vec![]);
        let mut catalog = QuestionCatalog::new();
        catalog.insert(
            "q9".to_string(),
            LocatedQuestion {
                survey_id: "other".to_string(),
                group_title: "Elsewhere".to_string(),
                group_order: 2,
                question: question("q9", "Noise", QuestionType::Text, &[]),
            },
        );

        let descriptor = resolve_descriptor(&Answer::text("q9", "loud"), None, &current, &catalog);
        assert_eq!(descriptor.label, "Elsewhere - Noise (주관식)");
        assert_eq!(descriptor.source, DescriptorSource::Catalog);
        assert!(descriptor.is_text());
        assert_eq!(descriptor.order, HISTORICAL_ORDER_OFFSET + 2000);
    }

    #[test]
    fn test_resolve_placeholders() {
        let current = survey(vec![question("q1", "Facilities", QuestionType::Scale, &[("a", "Lobby")])]);
        let catalog = QuestionCatalog::new();

        let missing = resolve_descriptor(&Answer::not_applicable("zz", None), None, &current, &catalog);
        assert_eq!(missing.label, DELETED_QUESTION_LABEL);
        assert_eq!(missing.order, PLACEHOLDER_ORDER);
        assert_eq!(missing.source, DescriptorSource::Placeholder);

        let text = resolve_descriptor(&Answer::text("zz", "hi"), None, &current, &catalog);
        assert!(text.is_text());

        let sub_gone = resolve_descriptor(&Answer::scale("q1", Some("b"), 4), None, &current, &catalog);
        assert_eq!(sub_gone.label, "Service - Facilities ([deleted sub-question])");
        assert_eq!(sub_gone.order, PLACEHOLDER_ORDER);
    }

    #[test]
    fn test_resolve_question_that_gained_sub_questions() {
        let current = survey(vec![question("q1", "Facilities", QuestionType::Scale, &[("a", "Lobby")])]);
        let descriptor = resolve_descriptor(&Answer::scale("q1", None, 2), None, &current, &QuestionCatalog::new());
        assert_eq!(descriptor.label, "Service - Facilities");
        assert_eq!(descriptor.order, HISTORICAL_ORDER_OFFSET);
        assert_eq!(descriptor.source, DescriptorSource::CurrentStructure);
    }

    #[test]
    fn test_build_sorts_and_deduplicates() {
        let current = survey(vec![question("q1", "Friendliness", QuestionType::Scale, &[])]);
        let response = Response {
            id: "r".to_string(),
            survey_id: "s".to_string(),
            patient_name: None,
            patient_type: None,
            patient_info_answers: None,
            submitted_at: Utc::now(),
            answers: vec![
                Answer::scale("q1", None, 5),
                Answer::scale("zz", None, 1),
                Answer::scale("aa", None, 1),
            ],
            question_snapshot: None,
        };

        let descriptors = build_descriptors(&current, &[&response, &response], &QuestionCatalog::new());
        let keys: Vec<&str> = descriptors.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["q1", "aa", "zz"]);
    }
}
