//! In-memory export table: header, one sheet per patient type, typed cells

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::ExportOptions;
use super::descriptors::Descriptor;
use super::helpers::{format_timestamp, unique_sheet_name};
use crate::model::{AnswerValue, PatientType, Response};

pub const SUBMITTED_AT_HEADER: &str = "제출일시";
pub const PATIENT_NAME_HEADER: &str = "환자 성함";
pub const PATIENT_TYPE_HEADER: &str = "환자 유형";
pub const NOT_APPLICABLE_LABEL: &str = "해당없음";

/// Partition for responses without a patient type
pub const UNSPECIFIED: &str = "unspecified";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(i64),
    NotApplicable,
}

impl Cell {
    fn text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    /// Display form, as written to the workbook
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Number(value) => value.to_string(),
            Cell::NotApplicable => NOT_APPLICABLE_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub patient_type: String,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportStats {
    pub total_responses: usize,
    pub latest: Option<DateTime<Utc>>,
    pub oldest: Option<DateTime<Utc>>,
}

impl ExportStats {
    fn from_responses(responses: &[&Response]) -> Self {
        Self {
            total_responses: responses.len(),
            latest: responses.iter().map(|r| r.submitted_at).max(),
            oldest: responses.iter().map(|r| r.submitted_at).min(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub header: Vec<String>,
    pub descriptors: Vec<Descriptor>,
    pub sheets: Vec<Sheet>,
    pub stats: ExportStats,
}

impl ExportTable {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

fn partition_key(response: &Response) -> String {
    response
        .patient_type
        .as_deref()
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .unwrap_or(UNSPECIFIED)
        .to_string()
}

/// Fixed patient types first in declared order, other recorded types
/// alphabetically, `unspecified` last
fn partition_rank(key: &str) -> (usize, &str) {
    match PatientType::ALL.iter().position(|kind| kind.as_str() == key) {
        Some(index) => (index, ""),
        None if key == UNSPECIFIED => (PatientType::ALL.len() + 1, ""),
        None => (PatientType::ALL.len(), key),
    }
}

fn partition<'a>(responses: &[&'a Response]) -> Vec<(String, Vec<&'a Response>)> {
    let mut groups: BTreeMap<String, Vec<&'a Response>> = BTreeMap::new();
    for response in responses {
        groups.entry(partition_key(response)).or_default().push(response);
    }

    let mut groups: Vec<(String, Vec<&'a Response>)> = groups.into_iter().collect();
    groups.sort_by(|(a, _), (b, _)| partition_rank(a).cmp(&partition_rank(b)));

    for (_, rows) in &mut groups {
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then_with(|| a.id.cmp(&b.id)));
    }

    groups
}

fn patient_info_cell(value: Option<&Value>) -> Cell {
    match value {
        Some(Value::String(text)) => Cell::text(text),
        Some(Value::Array(items)) => {
            let joined = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>()
                .join(", ");
            Cell::text(&joined)
        }
        Some(Value::Number(number)) => Cell::Text(number.to_string()),
        Some(Value::Bool(flag)) => Cell::Text(flag.to_string()),
        _ => Cell::Empty,
    }
}

fn answer_cell(response: &Response, descriptor: &Descriptor) -> Cell {
    let Some(answer) = response.find_answer(&descriptor.question_id, descriptor.sub_question_id.as_deref()) else {
        return Cell::Empty;
    };

    if descriptor.is_text() {
        return answer.text_value().map(Cell::text).unwrap_or(Cell::Empty);
    }

    match &answer.value {
        AnswerValue::NotApplicable => Cell::NotApplicable,
        AnswerValue::Scale(value) => Cell::Number(*value),
        AnswerValue::Text(_) => Cell::Empty,
    }
}

fn build_row(response: &Response, descriptors: &[Descriptor], options: &ExportOptions, timezone: Tz) -> Vec<Cell> {
    let mut row = vec![
        Cell::Text(format_timestamp(response.submitted_at, timezone)),
        response.patient_name.as_deref().map(Cell::text).unwrap_or(Cell::Empty),
        Cell::text(response.patient_type.as_deref().map(str::trim).unwrap_or_default()),
    ];

    for info in &options.patient_info_questions {
        let value = response.patient_info_answers.as_ref().and_then(|answers| answers.get(&info.id));
        row.push(patient_info_cell(value));
    }

    row.extend(descriptors.iter().map(|descriptor| answer_cell(response, descriptor)));
    row
}

pub fn build_header(descriptors: &[Descriptor], options: &ExportOptions) -> Vec<String> {
    let mut header = vec![
        SUBMITTED_AT_HEADER.to_string(),
        PATIENT_NAME_HEADER.to_string(),
        PATIENT_TYPE_HEADER.to_string(),
    ];
    header.extend(options.patient_info_questions.iter().map(|info| info.label.clone()));
    header.extend(descriptors.iter().map(|descriptor| descriptor.label.clone()));
    header
}

/// Lay out already filtered responses into per-patient-type sheets
pub fn build_table(responses: &[&Response], descriptors: Vec<Descriptor>, options: &ExportOptions) -> ExportTable {
    let header = build_header(&descriptors, options);
    let mut used_names = HashSet::new();

    let mut sheets: Vec<Sheet> = partition(responses)
        .into_iter()
        .map(|(patient_type, rows)| Sheet {
            name: unique_sheet_name(&patient_type, &mut used_names),
            rows: rows
                .iter()
                .map(|response| build_row(response, &descriptors, options, options.timezone))
                .collect(),
            patient_type,
        })
        .collect();

    if sheets.is_empty() {
        sheets.push(Sheet {
            name: unique_sheet_name(UNSPECIFIED, &mut used_names),
            patient_type: UNSPECIFIED.to_string(),
            rows: Vec::new(),
        });
    }

    ExportTable {
        header,
        descriptors,
        sheets,
        stats: ExportStats::from_responses(responses),
    }
}
