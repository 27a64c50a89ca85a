//! End-to-end export: storage, reconciliation and the written workbook

mod common;

use calamine::{Reader, Xlsx, open_workbook_from_rs};
use chrono::NaiveDate;
use common::{complete_answers, sample_draft, storage, submission, two_question_draft, utc};
use patient_survey::export::{ExportOptions, PatientInfoQuestion, ResponseExporter};
use patient_survey::model::{Answer, DateRange, QuestionSnapshot, SurveyDraft};
use patient_survey::storage::{RetryConfig, RetryPolicy, Storage};
use serde_json::json;
use std::io::Cursor;

struct SheetData {
    name: String,
    rows: Vec<Vec<String>>,
}

fn read_workbook(bytes: Vec<u8>) -> Vec<SheetData> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    let names = workbook.sheet_names().to_owned();

    names
        .into_iter()
        .map(|name| {
            let range = workbook.worksheet_range(&name).unwrap();
            let rows = range
                .rows()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect();
            SheetData { name, rows }
        })
        .collect()
}

fn exporter(storage: Storage, options: ExportOptions) -> ResponseExporter<Storage> {
    ResponseExporter::new(storage, options, RetryPolicy::new(RetryConfig::disabled()))
}

fn utc_options() -> ExportOptions {
    ExportOptions {
        timezone: chrono_tz::UTC,
        ..ExportOptions::default()
    }
}

#[tokio::test]
async fn test_header_matches_structure() {
    let storage = storage().await;
    let survey = storage.create_survey(&sample_draft()).await.unwrap();
    storage
        .create_response(&submission(&survey, "outpatient", complete_answers(&survey, 4, "좋아요")), None)
        .await
        .unwrap();

    let options = ExportOptions {
        patient_info_questions: vec![PatientInfoQuestion {
            id: "age".to_string(),
            label: "연령".to_string(),
        }],
        ..utc_options()
    };
    let output = exporter(storage, options)
        .export(&survey.id, &DateRange::unbounded())
        .await
        .unwrap()
        .unwrap();

    let sheets = read_workbook(output.bytes);
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].name, "outpatient");

    // 3 fixed + 1 patient info + Friendliness, Lobby, Rooms, Comments
    let header = &sheets[0].rows[0];
    assert_eq!(header.len(), 3 + 1 + 4);
    assert_eq!(
        header[..],
        [
            "제출일시",
            "환자 성함",
            "환자 유형",
            "연령",
            "Service - Friendliness",
            "Service - Facilities (Lobby)",
            "Service - Facilities (Rooms)",
            "Service - Comments (주관식)",
        ]
    );

    let row = &sheets[0].rows[1];
    assert_eq!(row[1], "홍길동");
    assert_eq!(row[4..], ["4", "4", "4", "좋아요"]);
    assert_eq!(output.stats.total_responses, 1);
}

#[tokio::test]
async fn test_friendliness_and_comments_scenario() {
    let storage = storage().await;
    let survey = storage.create_survey(&two_question_draft()).await.unwrap();
    let friendliness = survey.question_groups[0].questions[0].id.clone();
    let comments = survey.question_groups[0].questions[1].id.clone();

    storage
        .create_response_at(
            &submission(
                &survey,
                "outpatient",
                vec![Answer::scale(&friendliness, None, 5), Answer::text(&comments, "Great")],
            ),
            None,
            utc(1, 1, 9),
        )
        .await
        .unwrap();
    storage
        .create_response_at(
            &submission(&survey, "ward-3", vec![Answer::not_applicable(&friendliness, None)]),
            None,
            utc(1, 2, 9),
        )
        .await
        .unwrap();

    let output = exporter(storage, utc_options())
        .export(&survey.id, &DateRange::unbounded())
        .await
        .unwrap()
        .unwrap();
    let sheets = read_workbook(output.bytes);

    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["outpatient", "ward-3"]);

    assert_eq!(sheets[0].rows[1][0], "2024-01-01 09:00:00");
    assert_eq!(sheets[0].rows[1][3..], ["5", "Great"]);
    assert_eq!(sheets[1].rows[1][2], "ward-3");
    assert_eq!(sheets[1].rows[1][3], "해당없음");
    assert_eq!(sheets[1].rows[1][4], "");
}

#[tokio::test]
async fn test_date_range_filter() {
    let storage = storage().await;
    let survey = storage.create_survey(&two_question_draft()).await.unwrap();
    for when in [utc(1, 1, 12), utc(1, 15, 12), utc(2, 1, 12)] {
        storage
            .create_response_at(&submission(&survey, "checkup", complete_answers(&survey, 3, "x")), None, when)
            .await
            .unwrap();
    }

    let range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 10), NaiveDate::from_ymd_opt(2024, 1, 31));
    let output = exporter(storage, utc_options())
        .export(&survey.id, &range)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(output.stats.total_responses, 1);
    assert_eq!(output.stats.latest, Some(utc(1, 15, 12)));
    assert!(output.filename.ends_with("_responses_20240110-20240131.xlsx"));

    let sheets = read_workbook(output.bytes);
    assert_eq!(sheets[0].rows.len(), 2);
    assert_eq!(sheets[0].rows[1][0], "2024-01-15 12:00:00");
}

#[tokio::test]
async fn test_local_date_boundary_uses_configured_timezone() {
    let storage = storage().await;
    let survey = storage.create_survey(&two_question_draft()).await.unwrap();
    // 2024-01-09 20:00 UTC is 2024-01-10 05:00 in Seoul
    storage
        .create_response_at(&submission(&survey, "checkup", complete_answers(&survey, 3, "x")), None, utc(1, 9, 20))
        .await
        .unwrap();

    let range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 10), None);
    let seoul = exporter(storage.clone(), ExportOptions::default());
    let (_, table) = seoul.build_table(&survey.id, &range).await.unwrap().unwrap();
    assert_eq!(table.stats.total_responses, 1);

    let (_, table) = exporter(storage, utc_options())
        .build_table(&survey.id, &range)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(table.stats.total_responses, 0);
}

#[tokio::test]
async fn test_deleted_questions_survive_edits() {
    let storage = storage().await;
    let survey = storage.create_survey(&sample_draft()).await.unwrap();
    let snapshot = QuestionSnapshot {
        groups: survey.question_groups.clone(),
    };
    storage
        .create_response(
            &submission(&survey, "ward-6", complete_answers(&survey, 2, "old comment")),
            Some(&snapshot),
        )
        .await
        .unwrap();

    // Drop Comments and the Rooms sub-question, add a new question
    let mut draft = SurveyDraft::from(&survey);
    draft.question_groups[0].questions.remove(2);
    draft.question_groups[0].questions[1].sub_questions.remove(1);
    draft.question_groups[0].questions.push(patient_survey::model::QuestionDraft {
        text: "Parking".to_string(),
        ..patient_survey::model::QuestionDraft::new(patient_survey::model::QuestionType::Scale)
    });
    storage.replace_survey(&survey.id, &draft).await.unwrap();

    let (_, table) = exporter(storage, utc_options())
        .build_table(&survey.id, &DateRange::unbounded())
        .await
        .unwrap()
        .unwrap();

    let labels: Vec<&str> = table.header[3..].iter().map(String::as_str).collect();
    assert_eq!(
        labels,
        vec![
            "Service - Friendliness",
            "Service - Facilities (Lobby)",
            "Service - Parking",
            "Service - Facilities (Rooms)",
            "Service - Comments (주관식)",
        ]
    );

    let row: Vec<String> = table.sheets[0].rows[0][3..].iter().map(|cell| cell.display()).collect();
    assert_eq!(row, vec!["2", "2", "", "2", "old comment"]);
}

#[tokio::test]
async fn test_export_of_unknown_and_empty_surveys() {
    let storage = storage().await;
    let empty = storage
        .create_survey(&SurveyDraft {
            title: "Empty".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let exporter = exporter(storage, utc_options());

    assert!(exporter.export("missing", &DateRange::unbounded()).await.unwrap().is_none());

    let output = exporter.export(&empty.id, &DateRange::unbounded()).await.unwrap().unwrap();
    let sheets = read_workbook(output.bytes);
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].name, "unspecified");
    assert_eq!(sheets[0].rows, vec![vec!["제출일시", "환자 성함", "환자 유형"]]);
}

#[tokio::test]
async fn test_repeated_exports_are_identical() {
    let storage = storage().await;
    let survey = storage.create_survey(&sample_draft()).await.unwrap();
    let mut response = submission(&survey, " ward-3 ", complete_answers(&survey, 1, "x"));
    response.patient_info_answers = json!({"age": ["40대"]}).as_object().cloned();
    storage.create_response(&response, None).await.unwrap();
    storage
        .create_response(&submission(&survey, "", complete_answers(&survey, 5, "y")), None)
        .await
        .unwrap();

    let exporter = exporter(storage, utc_options());
    let (_, first) = exporter.build_table(&survey.id, &DateRange::unbounded()).await.unwrap().unwrap();
    let (_, second) = exporter.build_table(&survey.id, &DateRange::unbounded()).await.unwrap().unwrap();

    assert_eq!(first, second);
    let names: Vec<&str> = first.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["ward-3", "unspecified"]);
}

#[tokio::test]
async fn test_recorded_patient_type_with_apostrophe_at_cap_still_exports() {
    let storage = storage().await;
    let survey = storage.create_survey(&two_question_draft()).await.unwrap();
    let legacy_type = format!("{}'bbbb", "a".repeat(30));
    storage
        .create_response(&submission(&survey, &legacy_type, complete_answers(&survey, 3, "x")), None)
        .await
        .unwrap();

    let output = exporter(storage, utc_options())
        .export(&survey.id, &DateRange::unbounded())
        .await
        .unwrap()
        .unwrap();

    let sheets = read_workbook(output.bytes);
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].name, "a".repeat(30));
    assert_eq!(sheets[0].rows[1][2], legacy_type);
}
